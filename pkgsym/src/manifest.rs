use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::constants::MANIFEST_FILE_NAME;

pub mod error;

/// The parts of a `package.json` that matter for linking. Any other fields are ignored.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PackageManifest {
    /// Package name. Links are created at `Packages/<name>`.
    pub name: String,
    /// Package version, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Display for PackageManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} : {version}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl TryFrom<PathBuf> for PackageManifest {
    type Error = error::ManifestError;

    /// Read a manifest file. `value` is the path of the `package.json` itself.
    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        let manifest_path = value;

        if !manifest_path
            .try_exists()
            .map_err(|err| error::ManifestError::Io {
                source: err,
                path: manifest_path.clone(),
            })?
        {
            return Err(error::ManifestError::NotFound(manifest_path));
        }

        let manifest_str =
            fs::read_to_string(&manifest_path).map_err(|err| error::ManifestError::Io {
                source: err,
                path: manifest_path.clone(),
            })?;

        Self::parse(&manifest_str, manifest_path)
    }
}

impl PackageManifest {
    /// Path of the manifest inside package folder `dir`.
    pub fn path_in<P: AsRef<Path>>(dir: P) -> PathBuf {
        dir.as_ref().join(MANIFEST_FILE_NAME)
    }

    /// Read the manifest of the package folder `dir`.
    ///
    /// # Errors
    ///
    /// An error is returned if `dir` has no `package.json`, it cannot be read, it is not a JSON
    /// object with a string `name`, or the name is empty.
    pub fn try_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, error::ManifestError> {
        Self::try_from(Self::path_in(dir))
    }

    /// Like [`Self::try_from_dir`], but any failure is treated as "no manifest". Used wherever the
    /// manifest is only shown to the user.
    pub fn read_lossy<P: AsRef<Path>>(dir: P) -> Option<Self> {
        Self::try_from_dir(dir).ok()
    }

    /// Parse manifest contents. `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// See [`Self::try_from_dir`].
    pub fn parse<P: Into<PathBuf>>(contents: &str, path: P) -> Result<Self, error::ManifestError> {
        let path = path.into();
        let manifest: Self =
            serde_json::from_str(contents).map_err(|err| error::ManifestError::Parse {
                source: err,
                path: path.clone(),
            })?;

        if manifest.name.trim().is_empty() {
            return Err(error::ManifestError::EmptyName(path));
        }

        Ok(manifest)
    }
}
