//! Platform primitives for creating, removing and reading directory links.
//!
//! [`NativeBackend`] calls the OS directly: symlinks on Unix, junctions on Windows (junctions do
//! not need elevated privileges). [`ShellBackend`] runs the platform's link commands instead and
//! applies the exit code rules from [`crate::process`].

use std::{
    ffi::OsStr,
    fmt::{self, Display},
    io,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::{
    process::{ProcessError, run_command},
    utils::replace_home_with_tilde,
};

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("failed to access '{path}'")]
    Io { source: io::Error, path: PathBuf },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Where a link points to, if that can be determined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkSource {
    Resolved(PathBuf),
    Unresolved,
}

/// Which backend to use.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMethod {
    /// Call the OS link primitives directly.
    #[default]
    Native,
    /// Run the platform's link commands (`ln`/`unlink`, `mklink`/`rd`/`dir`).
    Shell,
}

pub trait LinkBackend {
    /// Create a directory link at `link` pointing to `source`.
    ///
    /// # Errors
    ///
    /// An error is returned if the link could not be created.
    fn create_link(&self, source: &Path, link: &Path) -> Result<(), BackendError>;

    /// Remove the directory link at `link`, leaving its source untouched.
    ///
    /// # Errors
    ///
    /// An error is returned if the link could not be removed.
    fn remove_link(&self, link: &Path) -> Result<(), BackendError>;

    /// Find out where `link` points to.
    fn read_source(&self, link: &Path) -> LinkSource;
}

impl<B: LinkBackend + ?Sized> LinkBackend for Box<B> {
    fn create_link(&self, source: &Path, link: &Path) -> Result<(), BackendError> {
        (**self).create_link(source, link)
    }

    fn remove_link(&self, link: &Path) -> Result<(), BackendError> {
        (**self).remove_link(link)
    }

    fn read_source(&self, link: &Path) -> LinkSource {
        (**self).read_source(link)
    }
}

impl LinkSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            LinkSource::Resolved(path) => Some(path),
            LinkSource::Unresolved => None,
        }
    }
}

impl Display for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSource::Resolved(path) => write!(f, "{}", replace_home_with_tilde(path)),
            LinkSource::Unresolved => write!(f, "unknown"),
        }
    }
}

impl Display for LinkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkMethod::Native => "native",
            LinkMethod::Shell => "shell",
        };

        write!(f, "{s}")
    }
}

/// Whether `path` itself (not what it points to) is a symlink or junction.
pub fn is_link<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let is_symlink = path
        .symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);

    #[cfg(windows)]
    {
        is_symlink || junction::exists(path).unwrap_or(false)
    }

    #[cfg(not(windows))]
    {
        is_symlink
    }
}

/// Read the target of a link with the OS primitive.
#[cfg(windows)]
fn read_source_native(link: &Path) -> LinkSource {
    junction::get_target(link)
        .or_else(|_| std::fs::read_link(link))
        .map_or(LinkSource::Unresolved, LinkSource::Resolved)
}

/// Read the target of a link with the OS primitive.
#[cfg(not(windows))]
fn read_source_native(link: &Path) -> LinkSource {
    std::fs::read_link(link).map_or(LinkSource::Unresolved, LinkSource::Resolved)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBackend;

impl LinkBackend for NativeBackend {
    fn create_link(&self, source: &Path, link: &Path) -> Result<(), BackendError> {
        #[cfg(unix)]
        let res = std::os::unix::fs::symlink(source, link);

        #[cfg(windows)]
        let res = junction::create(source, link);

        #[cfg(not(any(windows, unix)))]
        let res: io::Result<()> = Err(io::Error::from(io::ErrorKind::Unsupported));

        res.map_err(|err| BackendError::Io {
            source: err,
            path: link.to_path_buf(),
        })
    }

    fn remove_link(&self, link: &Path) -> Result<(), BackendError> {
        // a junction is removed like an empty directory, a unix symlink like a file
        #[cfg(windows)]
        let res = std::fs::remove_dir(link);

        #[cfg(not(windows))]
        let res = std::fs::remove_file(link);

        res.map_err(|err| BackendError::Io {
            source: err,
            path: link.to_path_buf(),
        })
    }

    fn read_source(&self, link: &Path) -> LinkSource {
        read_source_native(link)
    }
}

/// Runs the platform link commands. `lenient` excuses non-zero exit codes with an empty stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellBackend {
    pub lenient: bool,
}

impl ShellBackend {
    pub fn new(lenient: bool) -> Self {
        Self { lenient }
    }
}

impl LinkBackend for ShellBackend {
    fn create_link(&self, source: &Path, link: &Path) -> Result<(), BackendError> {
        #[cfg(windows)]
        let output = run_command(
            "cmd.exe",
            &[
                OsStr::new("/C"),
                OsStr::new("mklink"),
                OsStr::new("/J"),
                link.as_os_str(),
                source.as_os_str(),
            ],
            None,
        )?;

        #[cfg(not(windows))]
        let output = run_command(
            "ln",
            &[OsStr::new("-s"), source.as_os_str(), link.as_os_str()],
            None,
        )?;

        output.into_result(self.lenient)?;
        Ok(())
    }

    fn remove_link(&self, link: &Path) -> Result<(), BackendError> {
        #[cfg(windows)]
        let output = run_command(
            "cmd.exe",
            &[
                OsStr::new("/C"),
                OsStr::new("rd"),
                link.as_os_str(),
            ],
            None,
        )?;

        #[cfg(not(windows))]
        let output = run_command("unlink", &[link.as_os_str()], None)?;

        output.into_result(self.lenient)?;
        Ok(())
    }

    fn read_source(&self, link: &Path) -> LinkSource {
        #[cfg(windows)]
        {
            read_source_from_dir_listing(link, self.lenient)
        }

        // readlink is always available here, no need to scrape `ls`
        #[cfg(not(windows))]
        {
            read_source_native(link)
        }
    }
}

/// Best effort: run `dir` on the parent of `link` and scrape the junction target out of it.
#[cfg(windows)]
fn read_source_from_dir_listing(link: &Path, lenient: bool) -> LinkSource {
    let (Some(parent), Some(name)) = (link.parent(), link.file_name()) else {
        return LinkSource::Unresolved;
    };

    let listing = run_command(
        "cmd.exe",
        &[
            OsStr::new("/C"),
            OsStr::new("dir"),
            parent.as_os_str(),
        ],
        None,
    )
    .ok()
    .and_then(|out| out.into_result(lenient).ok());

    match listing {
        Some(out) => parse_dir_listing(&out.stdout, &name.to_string_lossy()),
        None => LinkSource::Unresolved,
    }
}

/// Pull the target of the link called `name` out of `dir` output. Windows lists links as
///
/// ```text
/// 01/02/2024  10:00 AM    <JUNCTION>     com.example.foo [C:\dev\foo]
/// ```
///
/// so the target is whatever sits between the brackets following the name. Yields
/// [`LinkSource::Unresolved`] if there is no such line, or if the target contains
/// [`char::REPLACEMENT_CHARACTER`]: `cmd.exe` writes in the OEM code page, and a target that did
/// not decode as UTF-8 would be a wrong path.
pub fn parse_dir_listing(listing: &str, name: &str) -> LinkSource {
    let Ok(re) = Regex::new(&format!(r"\s{}\s+\[([^\]]*)\]", regex::escape(name))) else {
        return LinkSource::Unresolved;
    };

    listing
        .lines()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|target| !target.is_empty() && !target.contains(char::REPLACEMENT_CHARACTER))
        .map_or(LinkSource::Unresolved, |target| {
            LinkSource::Resolved(PathBuf::from(target))
        })
}
