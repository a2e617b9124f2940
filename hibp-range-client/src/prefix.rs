use std::fmt;

/// The length of a hash prefix sent to the range API (5 hex characters).
pub const PREFIX_LEN: usize = 5;

/// The only part of a hash that ever leaves the process.
///
/// Always 5 uppercase ASCII bytes, so it can be rendered as `&str` without
/// re-validation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix([u8; PREFIX_LEN]);

impl Prefix {
    /// Takes the first 5 characters of `hash`, uppercased.
    ///
    /// Returns `None` if the hash is shorter than [`PREFIX_LEN`] or its first
    /// 5 bytes are not ASCII.
    pub fn from_hash(hash: &str) -> Option<Self> {
        let head = hash.as_bytes().get(..PREFIX_LEN)?;
        if !head.is_ascii() {
            return None;
        }

        let mut out = [0u8; PREFIX_LEN];
        for (dst, src) in out.iter_mut().zip(head) {
            *dst = src.to_ascii_uppercase();
        }
        Some(Self(out))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: `from_hash` only stores ASCII bytes.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({})", self.as_str())
    }
}

/// Which digest the local hashes are, and therefore which range endpoint to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashMode {
    /// NT hashes from an Active Directory export (32 hex chars).
    #[default]
    Ntlm,
    /// SHA-1 digests (40 hex chars).
    Sha1,
}

impl HashMode {
    /// Expected digest length in hex characters.
    pub fn digest_len(self) -> usize {
        match self {
            HashMode::Ntlm => 32,
            HashMode::Sha1 => 40,
        }
    }

    /// Query string appended to the range URL, if any.
    pub fn query_param(self) -> Option<&'static str> {
        match self {
            HashMode::Ntlm => Some("mode=ntlm"),
            HashMode::Sha1 => None,
        }
    }
}

impl fmt::Display for HashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashMode::Ntlm => f.write_str("ntlm"),
            HashMode::Sha1 => f.write_str("sha1"),
        }
    }
}
