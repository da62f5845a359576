use super::error::EngineError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of the per-batch cache files written by the shower engine.
pub const SHOWER_CACHE_EXTENSION: &str = "shower.cache";

/// A directory in which an engine leaves scratch files with a known extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    path: PathBuf,
    extension: String,
}

impl ScratchDir {
    pub fn new(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the scratch file `{stem}.{extension}`.
    pub fn file_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{}.{}", stem, self.extension))
    }

    pub fn ensure(&self) -> Result<(), EngineError> {
        fs::create_dir_all(&self.path).map_err(|source| self.error(&self.path, source))
    }

    /// Deletes every regular file carrying the scratch extension and returns how many
    /// were removed. A missing directory holds no scratch files.
    pub fn purge(&self) -> Result<usize, EngineError> {
        if !self.path.is_dir() {
            return Ok(0);
        }
        let suffix = format!(".{}", self.extension);
        let mut removed = 0;
        let entries = fs::read_dir(&self.path).map_err(|source| self.error(&self.path, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| self.error(&self.path, source))?;
            let path = entry.path();
            let is_scratch = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&suffix));
            if is_scratch {
                fs::remove_file(&path).map_err(|source| self.error(&path, source))?;
                removed += 1;
            }
        }
        debug!(dir = %self.path.display(), removed, "Scratch files purged.");
        Ok(removed)
    }

    fn error(&self, path: &Path, source: std::io::Error) -> EngineError {
        EngineError::Scratch {
            path: path.display().to_string(),
            source,
        }
    }
}
