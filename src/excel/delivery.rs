//! Delivery sinks for rendered export files

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::error::{ExportError, ExportResult};

/// A rendered export ready to hand to the host environment
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    /// File name including extension, e.g. `orders.xlsx`
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Receives rendered files: a directory on disk, an in-memory buffer,
/// an HTTP response body.
pub trait Delivery {
    fn deliver(&self, file: &ExportFile) -> ExportResult<()>;
}

/// Writes files into a directory
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path a file with this name would be written to
    pub fn target(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&self, file: &ExportFile) -> ExportResult<()> {
        // Never let a filename escape the output directory
        let name = Path::new(&file.filename)
            .file_name()
            .ok_or_else(|| {
                ExportError::Validation(format!("Invalid export filename: {}", file.filename))
            })?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, &file.bytes)?;
        info!(path = %path.display(), bytes = file.bytes.len(), "Export written");
        Ok(())
    }
}

/// Keeps delivered files in memory
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    files: Mutex<Vec<ExportFile>>,
}

impl MemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far
    pub fn files(&self) -> Vec<ExportFile> {
        self.files
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<ExportFile> {
        self.files
            .lock()
            .map(|mut files| std::mem::take(&mut *files))
            .unwrap_or_default()
    }
}

impl Delivery for MemoryDelivery {
    fn deliver(&self, file: &ExportFile) -> ExportResult<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))?;
        files.push(file.clone());
        Ok(())
    }
}
