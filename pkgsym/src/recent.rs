//! History of recently linked package folders.
//!
//! The history is one preference value: absolute paths joined with [`RECENT_SEPARATOR`], oldest
//! first. Re-adding a path moves it to the end instead of duplicating it.

use std::path::{Path, PathBuf};

use crate::{
    constants::{RECENT_PREFS_KEY, RECENT_SEPARATOR},
    error::RecentError,
    manifest::PackageManifest,
    prefs::PrefsStore,
};

/// A recently linked folder and, if it still has a readable `package.json`, its manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentEntry {
    pub source_path: PathBuf,
    pub manifest: Option<PackageManifest>,
}

#[derive(Debug)]
pub struct RecentHistory<P> {
    prefs: P,
    /// Maximum number of entries kept. `0` keeps everything.
    limit: usize,
}

/// Split a persisted history string, dropping empty entries.
fn split_history(s: &str) -> Vec<PathBuf> {
    s.split(RECENT_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn join_history(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(&RECENT_SEPARATOR.to_string())
}

impl<P: PrefsStore> RecentHistory<P> {
    pub fn new(prefs: P, limit: usize) -> Self {
        Self { prefs, limit }
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    /// All recent paths, oldest first.
    ///
    /// # Errors
    ///
    /// An error is returned if the preference store cannot be read.
    pub fn load(&self) -> Result<Vec<PathBuf>, RecentError> {
        let stored = self.prefs.load(RECENT_PREFS_KEY)?;
        Ok(split_history(&stored))
    }

    /// Record `path` as the most recent entry. If it is already present, it is moved to the end.
    /// The oldest entries are dropped past the limit.
    ///
    /// # Errors
    ///
    /// An error is returned if `path` contains [`RECENT_SEPARATOR`] (it could not be read back),
    /// or the preference store fails.
    pub fn add<Q: AsRef<Path>>(&mut self, path: Q) -> Result<(), RecentError> {
        let path = path.as_ref();
        if path.to_string_lossy().contains(RECENT_SEPARATOR) {
            return Err(RecentError::SeparatorInPath(path.to_path_buf()));
        }

        let mut paths = self.load()?;
        paths.retain(|p| p != path);
        paths.push(path.to_path_buf());
        if self.limit > 0 && paths.len() > self.limit {
            let excess = paths.len() - self.limit;
            paths.drain(..excess);
        }

        self.prefs.save(RECENT_PREFS_KEY, &join_history(&paths))?;
        Ok(())
    }

    /// Forget every entry.
    ///
    /// # Errors
    ///
    /// An error is returned if the preference store fails.
    pub fn clear(&mut self) -> Result<(), RecentError> {
        self.prefs.save(RECENT_PREFS_KEY, "")?;
        Ok(())
    }

    /// All recent paths with their manifests, oldest first. Folders that moved or lost their
    /// manifest get `manifest: None`.
    ///
    /// # Errors
    ///
    /// An error is returned if the preference store cannot be read.
    pub fn entries(&self) -> Result<Vec<RecentEntry>, RecentError> {
        Ok(self
            .load()?
            .into_iter()
            .map(|source_path| RecentEntry {
                manifest: PackageManifest::read_lossy(&source_path),
                source_path,
            })
            .collect())
    }
}
