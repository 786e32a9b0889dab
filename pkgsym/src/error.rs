use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::{backend::BackendError, manifest::error::ManifestError, prefs::PrefsError};

#[derive(Debug, ThisError)]
pub enum LinkError {
    #[error("no folder selected")]
    NoFolderSelected,
    #[error("failed to read package source {path:?}")]
    Source {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid package manifest")]
    Manifest(#[from] ManifestError),
    #[error("package name {0:?} cannot be used as a folder name")]
    InvalidName(String),
    #[error("directory {0:?} already exists")]
    DestinationExists(PathBuf),
    #[error("failed to link package")]
    Backend(#[from] BackendError),
    #[error("no recent package at index {0}")]
    NoRecentEntry(usize),
    #[error("failed to read recent packages")]
    Recent(#[from] RecentError),
    #[error("dry run")]
    DryRun,
}

#[derive(Debug, ThisError)]
pub enum UnlinkError {
    #[error("no package link at {0:?}")]
    LinkNotFound(PathBuf),
    #[error("{0:?} is not a symbolic link or junction")]
    NotALink(PathBuf),
    #[error("{0:?} is not inside the project's Packages folder")]
    OutsidePackages(PathBuf),
    #[error("failed to delete package link")]
    Backend(#[from] BackendError),
    #[error("dry run")]
    DryRun,
}

#[derive(Debug, ThisError)]
pub enum RecentError {
    #[error("path {0:?} contains the separator '{sep}'", sep = crate::constants::RECENT_SEPARATOR)]
    SeparatorInPath(PathBuf),
    #[error("failed to access recent packages")]
    Prefs(#[from] PrefsError),
}

#[derive(Debug, ThisError)]
pub enum ProjectError {
    #[error("no project (a folder with Assets and Packages) found at or above {0:?}")]
    NotFound(PathBuf),
    #[error("project {0:?} has no Packages folder")]
    MissingPackagesDir(PathBuf),
}

#[derive(Debug, ThisError)]
#[error("failed to read packages folder {path:?}")]
pub struct ScanError {
    pub source: std::io::Error,
    pub path: PathBuf,
}
