//! k-anonymity range queries against the Have I Been Pwned Pwned Passwords API.
//!
//! Only the first 5 hex characters of a hash ([`Prefix`]) are ever sent. The
//! API answers with every known hash sharing that prefix, as plaintext lines:
//!
//! ```text
//! 0005DE2A9668A41F6A508AFB6A6FC4A5:12
//! 0006CE2E6D8B6B1F8A59A7B0A2D7E5D1:1
//! ```
//!
//! Each line is the remaining suffix of the hash and how often it was seen in
//! breaches. Matching against local hashes is up to the caller, which keeps the
//! full hashes on the local machine.
//!
//! # Usage
//!
//! ```no_run
//! use hibp_range_client::{HashMode, HttpRangeClient, Prefix, RangeSource};
//!
//! # async fn run() -> Result<(), hibp_range_client::Error> {
//! let client = HttpRangeClient::builder().mode(HashMode::Ntlm).build()?;
//! let prefix = Prefix::from_hash("8846F7EAEE8FB117AD06BDD830B7586C").unwrap();
//! let body = client.query_prefix(&prefix).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod prefix;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpRangeClient, HttpRangeClientBuilder,
    RETRY_BASE_DELAY_MS, RangeSource,
};
pub use error::Error;
pub use prefix::{HashMode, PREFIX_LEN, Prefix};

/// Environment variable overriding the range API base URL.
pub const HIBP_API_URL_ENV: &str = "HIBP_API_URL";
