use std::path::PathBuf;

use thiserror::Error;

/// Reasons a source table could not be loaded. None of them abort the
/// pipeline; callers degrade to an empty table and surface a notice.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", path.display())]
    MissingResource { path: PathBuf },
    #[error("File is empty: {}", path.display())]
    EmptyResource { path: PathBuf },
    #[error("Failed to read {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::MissingResource { path }
            | LoadError::EmptyResource { path }
            | LoadError::Malformed { path, .. } => path,
        }
    }
}
