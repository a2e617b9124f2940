//! Append-only stream of exposed account names.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;

/// Streams exposed accounts, one per line, as they are discovered.
///
/// Every line is flushed right away so results found before an interruption
/// are kept. Writers are serialized: concurrent callers never interleave.
pub struct ResultSink {
    writer: Option<Mutex<Box<dyn Write + Send>>>,
    written: AtomicU64,
}

impl ResultSink {
    /// A sink that discards accounts but still counts them.
    pub fn disabled() -> Self {
        Self { writer: None, written: AtomicU64::new(0) }
    }

    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self { writer: Some(Mutex::new(Box::new(writer))), written: AtomicU64::new(0) }
    }

    /// Creates (or truncates) `path` and streams to it.
    pub fn create(path: &Path) -> Result<Self, Error> {
        let file = File::create(path)
            .map_err(|source| Error::CreateOutput { path: path.to_path_buf(), source })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn write(&self, account: &str) -> io::Result<()> {
        if let Some(writer) = &self.writer {
            let mut writer = writer.lock().map_err(|_| io::Error::other("result writer poisoned"))?;
            writeln!(writer, "{account}")?;
            writer.flush()?;
        }
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of accounts successfully written.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> io::Result<()> {
        match &self.writer {
            Some(writer) => writer
                .lock()
                .map_err(|_| io::Error::other("result writer poisoned"))?
                .flush(),
            None => Ok(()),
        }
    }
}

impl Drop for ResultSink {
    fn drop(&mut self) {
        if let Some(writer) = &mut self.writer {
            if let Ok(writer) = writer.get_mut() {
                let _ = writer.flush();
            }
        }
    }
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink")
            .field("enabled", &self.is_enabled())
            .field("written", &self.written())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// A cloneable in-memory writer for inspecting sink output.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8(bytes.clone()).unwrap().lines().map(str::to_string).collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Fails every write.
    pub struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
