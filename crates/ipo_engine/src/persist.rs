use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure a directory exists and accepts new files; create if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::Dir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir)
        .map_err(|e| PersistError::Dir(format!("{}: {}", dir.display(), e)))?;
    Ok(())
}

/// Replaces a file's content by writing a sibling temp file and renaming it
/// over the target, so readers see either the old or the new content.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    target: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(target: PathBuf) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Directory the temp file and the target live in.
    pub fn dir(&self) -> PathBuf {
        match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn write(&self, content: &str) -> Result<(), PersistError> {
        let dir = self.dir();
        ensure_dir(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.target).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}
