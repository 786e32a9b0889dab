use std::path::{Path, PathBuf};

use crate::{
    constants::{ASSETS_DIR_NAME, PACKAGES_DIR_NAME},
    error::ProjectError,
};

/// A project whose `Packages` folder links are created in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Use `root` as the project root. It only needs a `Packages` folder.
    ///
    /// # Errors
    ///
    /// [`ProjectError::MissingPackagesDir`] if `root/Packages` is not a directory.
    pub fn at<P: Into<PathBuf>>(root: P) -> Result<Self, ProjectError> {
        let root = root.into();
        if !root.join(PACKAGES_DIR_NAME).is_dir() {
            return Err(ProjectError::MissingPackagesDir(root));
        }

        Ok(Self { root })
    }

    /// Find the nearest ancestor of `start` (including itself) with both an `Assets` and a
    /// `Packages` folder.
    ///
    /// # Errors
    ///
    /// [`ProjectError::NotFound`] if no ancestor qualifies.
    pub fn locate<P: AsRef<Path>>(start: P) -> Result<Self, ProjectError> {
        let start = start.as_ref();
        start
            .ancestors()
            .find(|dir| dir.join(ASSETS_DIR_NAME).is_dir() && dir.join(PACKAGES_DIR_NAME).is_dir())
            .map(|root| Self {
                root: root.to_path_buf(),
            })
            .ok_or_else(|| ProjectError::NotFound(start.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR_NAME)
    }

    /// Where the link for package `name` goes.
    pub fn link_path(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }
}
