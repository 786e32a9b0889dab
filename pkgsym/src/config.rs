use std::{
    fs,
    path::{Path, PathBuf},
};

use const_format::formatc;
use serde::{Deserialize, Deserializer, Serialize, de::Error};

use crate::{
    backend::LinkMethod,
    cli::PkgsymCli,
    constants::{APP_DIR_NAME, BASE_DIRS},
    prefs::FilePrefs,
    process::default_lenient_exit_codes,
    utils::expand_into_pathbuf,
};

pub mod error;

/// Utility function to deserialize an optional [`PathBuf`] while expanding environment variables
/// and `~`.
///
/// # Arguments
///
/// - `d` - Argument to deserialize, expected to be `String`.
fn __de_opt_pathbuf<'de, D>(d: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    // NOTE: don't use &str or deserializing will fail for strings
    let s: Option<String> = Deserialize::deserialize(d)?;
    s.map(|s| expand_into_pathbuf(s).map_err(D::Error::custom))
        .transpose()
}

/// Utility function returning the default value for [`SymlinkerConfig::recent_limit`].
fn __recent_limit_default() -> usize {
    10
}

/// User configuration. Can de/serialize with [`serde`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SymlinkerConfig {
    /// Directory the config file lives in.
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// How links are created, removed and read.
    #[serde(default)]
    pub method: LinkMethod,
    /// Treat non-zero exit codes with an empty stderr as success. Unset means the per-OS default,
    /// see [`default_lenient_exit_codes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lenient_exit_codes: Option<bool>,
    /// How many recent packages to remember. `0` means no limit.
    #[serde(default = "__recent_limit_default")]
    pub recent_limit: usize,
    /// Command line run in the project root after every link change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_command: Option<String>,
    /// Where preferences (the recent history) are stored.
    #[serde(
        default,
        deserialize_with = "__de_opt_pathbuf",
        skip_serializing_if = "Option::is_none"
    )]
    pub prefs_file: Option<PathBuf>,
}

impl TryFrom<PathBuf> for SymlinkerConfig {
    type Error = error::ConfigRead;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        let config_path = value;

        if !config_path
            .try_exists()
            .map_err(|err| error::ConfigRead::Io {
                source: err,
                path: config_path.clone(),
            })?
        {
            return Err(error::ConfigRead::FileNotFound(config_path));
        }

        let config_str =
            &fs::read_to_string(&config_path).map_err(|err| error::ConfigRead::Io {
                source: err,
                path: config_path.clone(),
            })?;
        let mut parsed_config: Self = toml::from_str(config_str)?;
        parsed_config.config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(parsed_config)
    }
}

impl SymlinkerConfig {
    /// File name this struct will serialize to by default.
    const fn __serde_file_name() -> &'static str {
        "pkgsym.toml"
    }

    /// File name this struct will serialize to when saving to an OS-specific config.
    const fn __serde_os_file_name() -> &'static str {
        formatc!("pkgsym.{}.toml", std::env::consts::OS)
    }

    /// Default config directory: `<config dir>/pkgsym`.
    pub fn default_dir() -> PathBuf {
        BASE_DIRS.config_dir().join(APP_DIR_NAME)
    }

    /// Create a new [`SymlinkerConfig`] living in `config_dir` with default values.
    pub fn new<P: Into<PathBuf>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.into(),
            method: LinkMethod::default(),
            lenient_exit_codes: None,
            recent_limit: __recent_limit_default(),
            refresh_command: None,
            prefs_file: None,
        }
    }

    /// Try to read the config file from `config_dir`. An OS-specific config takes precedence over
    /// the generic one.
    ///
    /// # Errors
    ///
    /// An error will be returned if the config file does not exist, cannot be read, or contains
    /// malformed TOML data.
    pub fn try_from_dir<P: Into<PathBuf>>(config_dir: P) -> Result<Self, error::ConfigRead> {
        let config_dir: PathBuf = config_dir.into();
        let os_toml_path = config_dir.join(Self::__serde_os_file_name());
        let toml_path = if os_toml_path.try_exists().unwrap_or(false) {
            os_toml_path
        } else {
            config_dir.join(Self::__serde_file_name())
        };

        Self::try_from(toml_path)
    }

    /// Read the config from `config_dir`, falling back to defaults if there is none, and merge it
    /// with the CLI.
    ///
    /// # Errors
    ///
    /// An error is returned if a config file exists but cannot be read or parsed.
    pub fn init<P: Into<PathBuf>>(
        config_dir: P,
        cli: &PkgsymCli,
    ) -> Result<Self, error::ConfigRead> {
        let config_dir = config_dir.into();
        let mut config = match Self::try_from_dir(&config_dir) {
            Ok(config) => config,
            Err(error::ConfigRead::FileNotFound(_)) => Self::new(config_dir),
            Err(err) => return Err(err),
        };
        config.merge_with_cli(cli);

        Ok(config)
    }

    pub fn merge_with_cli(&mut self, cli: &PkgsymCli) {
        if let Some(method) = cli.method {
            self.method = method;
        }
    }

    /// Whether non-zero exit codes with an empty stderr count as success.
    pub fn lenient(&self) -> bool {
        self.lenient_exit_codes
            .unwrap_or_else(default_lenient_exit_codes)
    }

    /// Preference file to use, [`FilePrefs::default_path`] unless configured.
    pub fn prefs_path(&self) -> PathBuf {
        self.prefs_file
            .clone()
            .unwrap_or_else(FilePrefs::default_path)
    }

    /// Get the disk path for this `SymlinkerConfig`.
    #[inline]
    pub fn disk_path(&self) -> PathBuf {
        self.config_dir.join(Self::__serde_file_name())
    }

    pub fn os_disk_path(&self) -> PathBuf {
        self.config_dir.join(Self::__serde_os_file_name())
    }

    /// Utility function for saving this [`SymlinkerConfig`] to a given path.
    ///
    /// # Arguments
    ///
    /// - `config_path` - [`Path`] to serialize this config to.
    fn __inner_save<P: AsRef<Path>>(&self, config_path: P) -> Result<(), error::ConfigWrite> {
        let config_path = config_path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        fs::create_dir_all(&self.config_dir).map_err(|err| error::ConfigWrite::Io {
            source: err,
            path: self.config_dir.clone(),
        })?;
        // WARN: this truncates the existing file. be careful!
        fs::write(config_path, config_str).map_err(|err| error::ConfigWrite::Io {
            source: err,
            path: config_path.to_path_buf(),
        })?;
        Ok(())
    }

    /// Save this `SymlinkerConfig` to its config directory.
    ///
    /// # Errors
    ///
    /// An error will be returned if the config fails to serialize or the file cannot be
    /// written to for some reason.
    pub fn save(&self) -> Result<(), error::ConfigWrite> {
        self.__inner_save(self.disk_path())
    }

    /// Save this `SymlinkerConfig` as an OS-specific config. This uses [`std::env::consts::OS`] at
    /// compile time to determine which system the user is on.
    ///
    /// # Errors
    ///
    /// See [`Self::save`].
    pub fn save_os(&self) -> Result<(), error::ConfigWrite> {
        self.__inner_save(self.os_disk_path())
    }
}
