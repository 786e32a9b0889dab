use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ManifestError {
    #[error("package.json file not found at '{0}'")]
    NotFound(PathBuf),
    #[error("failed to read '{path}'")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse '{path}'")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("package.json name is empty in '{0}'")]
    EmptyName(PathBuf),
}
