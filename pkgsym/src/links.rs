use std::path::{Path, PathBuf};

use crate::{
    backend::{LinkBackend, LinkSource, is_link},
    error::ScanError,
    manifest::PackageManifest,
};

/// A link found in the packages folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedPackage {
    /// The link itself, `Packages/<name>`.
    pub link_path: PathBuf,
    /// What the link points to.
    pub source: LinkSource,
    /// The manifest read through the link, if it has a valid one.
    pub manifest: Option<PackageManifest>,
}

impl LinkedPackage {
    pub fn name(&self) -> Option<&str> {
        self.manifest.as_ref().map(|m| m.name.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.as_ref().and_then(|m| m.version.as_deref())
    }
}

/// Every link directly inside `packages_dir` that points at a directory, sorted by path.
///
/// Entries whose manifest is missing or broken are still listed, with `manifest: None`. Entries
/// that cannot be inspected at all are skipped.
///
/// # Errors
///
/// An error is returned if `packages_dir` itself cannot be read.
pub fn scan_links<B: LinkBackend + ?Sized>(
    packages_dir: &Path,
    backend: &B,
) -> Result<Vec<LinkedPackage>, ScanError> {
    let read_dir = packages_dir.read_dir().map_err(|err| ScanError {
        source: err,
        path: packages_dir.to_path_buf(),
    })?;

    let mut links = read_dir
        .filter_map(Result::ok)
        .map(|ent| ent.path())
        // is_dir follows the link, so dangling links are left out
        .filter(|path| is_link(path) && path.is_dir())
        .map(|link_path| LinkedPackage {
            source: backend.read_source(&link_path),
            manifest: PackageManifest::read_lossy(&link_path),
            link_path,
        })
        .collect::<Vec<_>>();

    links.sort_by(|a, b| a.link_path.cmp(&b.link_path));

    Ok(links)
}
