//! Envelope persistence: where the sealed blob lives between runs
//!
//! The envelope is opaque here. Stores never see a password, a KGK or a
//! plaintext payload, only the bytes produced by the crypto layer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{SesameError, SesameResult};

/// A place an envelope can be read from and written to.
pub trait EnvelopeStore {
    /// Short human-readable location, for logs and CLI output.
    fn describe(&self) -> String;

    /// Read the stored envelope, or `None` if nothing has been stored yet.
    fn load(&self) -> SesameResult<Option<Vec<u8>>>;

    /// Replace the stored envelope.
    fn save(&self, envelope: &[u8]) -> SesameResult<()>;
}

/// Envelope kept in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EnvelopeStore for FileStore {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn load(&self) -> SesameResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                tracing::debug!(path = %self.path.display(), len = bytes.len(), "envelope loaded");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, envelope: &[u8]) -> SesameResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        atomic_replace(&self.path, envelope)?;
        tracing::info!(path = %self.path.display(), len = envelope.len(), "envelope saved");
        Ok(())
    }
}

/// Atomically replace a file with new content.
///
/// Writes to a temp file in the same directory, then renames, so a reader
/// never observes a half-written envelope. The temp file is created
/// owner-only and is removed again if anything fails before the rename.
fn atomic_replace(path: &Path, content: &[u8]) -> SesameResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if path.file_name().is_none() {
        return Err(SesameError::Store(format!("not a file path: {}", path.display())));
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".sesame-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SesameError::Io(e.error))?;
    Ok(())
}

/// Envelope kept in memory; for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvelopeStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".into()
    }

    fn load(&self) -> SesameResult<Option<Vec<u8>>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| SesameError::Store("memory store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, envelope: &[u8]) -> SesameResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| SesameError::Store("memory store lock poisoned".into()))?;
        *guard = Some(envelope.to_vec());
        Ok(())
    }
}
