//! Persistent key/value preference storage.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error as ThisError;

use crate::constants::{APP_DIR_NAME, BASE_DIRS};

#[derive(Debug, ThisError)]
pub enum PrefsError {
    #[error("failed to access '{path}'")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse preferences '{path}'")]
    TomlRead {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("failed to serialize preferences")]
    TomlWrite(#[from] toml::ser::Error),
}

/// A string key/value store that survives between runs.
pub trait PrefsStore {
    /// Value stored under `key`, or an empty string if there is none.
    ///
    /// # Errors
    ///
    /// An error is returned if the backing storage exists but cannot be read.
    fn load(&self, key: &str) -> Result<String, PrefsError>;

    /// Store `value` under `key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// An error is returned if the backing storage cannot be written.
    fn save(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// Preferences kept in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemoryPrefs {
    values: HashMap<String, String>,
}

impl PrefsStore for MemoryPrefs {
    fn load(&self, key: &str) -> Result<String, PrefsError> {
        Ok(self.values.get(key).cloned().unwrap_or_default())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept as a flat TOML table of strings. The file is re-read on every [`load`] and
/// rewritten on every [`save`], so separate runs always see each other's writes.
///
/// [`load`]: PrefsStore::load
/// [`save`]: PrefsStore::save
#[derive(Clone, Debug)]
pub struct FilePrefs {
    path: PathBuf,
}

impl FilePrefs {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data dir>/pkgsym/prefs.toml`.
    pub fn default_path() -> PathBuf {
        BASE_DIRS.data_dir().join(APP_DIR_NAME).join("prefs.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        let path = &self.path;
        if !path.try_exists().map_err(|err| PrefsError::Io {
            source: err,
            path: path.clone(),
        })? {
            return Ok(BTreeMap::new());
        }

        let prefs_str = fs::read_to_string(path).map_err(|err| PrefsError::Io {
            source: err,
            path: path.clone(),
        })?;

        toml::from_str(&prefs_str).map_err(|err| PrefsError::TomlRead {
            source: err,
            path: path.clone(),
        })
    }
}

impl PrefsStore for FilePrefs {
    fn load(&self, key: &str) -> Result<String, PrefsError> {
        Ok(self.read_table()?.remove(key).unwrap_or_default())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), value.to_string());

        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_err = |err: std::io::Error| PrefsError::Io {
            source: err,
            path: parent.to_path_buf(),
        };
        fs::create_dir_all(parent).map_err(io_err)?;

        // the old file stays in place until the rename
        let prefs_str = toml::to_string_pretty(&table)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(prefs_str.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|err| PrefsError::Io {
            source: err.error,
            path: self.path.clone(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_memory_prefs() -> anyhow::Result<()> {
        let mut prefs = MemoryPrefs::default();
        assert_eq!(prefs.load("missing")?, "");

        prefs.save("key", "value")?;
        assert_eq!(prefs.load("key")?, "value");

        Ok(())
    }

    #[test]
    fn test_file_prefs_missing_file_is_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir().context("failed to make temp dir")?;
        let prefs = FilePrefs::new(dir.path().join("prefs.toml"));

        assert_eq!(prefs.load("PackageSymlinker_Recent")?, "");

        Ok(())
    }

    #[test]
    fn test_file_prefs_persist_between_instances() -> anyhow::Result<()> {
        let dir = tempfile::tempdir().context("failed to make temp dir")?;
        let path = dir.path().join("nested").join("prefs.toml");

        let mut prefs = FilePrefs::new(&path);
        prefs.save("a", "/pkgs/a#/pkgs/b")?;
        prefs.save("other", "kept")?;
        prefs.save("a", "/pkgs/b")?;

        let reopened = FilePrefs::new(&path);
        assert_eq!(reopened.load("a")?, "/pkgs/b");
        assert_eq!(reopened.load("other")?, "kept");

        Ok(())
    }

    #[test]
    fn test_file_prefs_bad_toml() -> anyhow::Result<()> {
        let dir = tempfile::tempdir().context("failed to make temp dir")?;
        let path = dir.path().join("prefs.toml");
        fs::write(&path, "this is = = not toml").context("failed to write bad prefs")?;

        let err = FilePrefs::new(&path).load("a").unwrap_err();
        assert!(matches!(err, PrefsError::TomlRead { .. }), "unexpected error: {err:?}");

        Ok(())
    }

    #[test]
    fn test_file_prefs_save_leaves_no_temp_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir().context("failed to make temp dir")?;
        let path = dir.path().join("nested").join("prefs.toml");
        let mut prefs = FilePrefs::new(&path);
        prefs.save("a", "/pkgs/a")?;
        prefs.save("a", "/pkgs/b")?;

        let names = fs::read_dir(path.parent().context("prefs file has no parent")?)?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(names, vec![std::ffi::OsString::from("prefs.toml")]);
        assert_eq!(prefs.load("a")?, "/pkgs/b");

        Ok(())
    }
}
