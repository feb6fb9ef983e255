//! Artifact sinks: where exported files go.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for exported artifacts, addressed by paths relative to the
/// scene output directory (e.g. `images/0003.jpg`).
///
/// Sinks are shared across worker threads when frames execute in parallel.
pub trait ArtifactSink: Send + Sync {
    /// Writes a file, creating intermediate directories as needed.
    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError>;

    /// Writes a file so that readers never observe partial content.
    fn write_atomic(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        self.write(relative_path, bytes)
    }

    /// Removes a file. Removing a file that does not exist succeeds.
    fn remove(&self, relative_path: &str) -> Result<(), SinkError>;
}

// ============================================================================
// FILESYSTEM
// ============================================================================

/// Writes artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn prepare(&self, relative_path: &str) -> Result<PathBuf, SinkError> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }
        Ok(path)
    }
}

impl ArtifactSink for FsSink {
    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let path = self.prepare(relative_path)?;
        fs::write(&path, bytes).map_err(|e| SinkError::io(&path, e))
    }

    /// Writes to a sibling temp file, then renames over the target.
    fn write_atomic(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let path = self.prepare(relative_path)?;
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        fs::write(&tmp, bytes).map_err(|e| SinkError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| SinkError::io(&path, e))
    }

    fn remove(&self, relative_path: &str) -> Result<(), SinkError> {
        let path = self.root.join(relative_path);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(SinkError::io(&path, e)),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// MEMORY
// ============================================================================

/// Collects artifacts in memory, keyed by relative path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Contents of a written file.
    pub fn get(&self, relative_path: &str) -> Option<Vec<u8>> {
        self.files().get(relative_path).cloned()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files().contains_key(relative_path)
    }

    /// All written paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    /// Consumes the sink, returning every file.
    pub fn into_files(self) -> BTreeMap<String, Vec<u8>> {
        self.files.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        self.files().insert(relative_path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, relative_path: &str) -> Result<(), SinkError> {
        self.files().remove(relative_path);
        Ok(())
    }
}
