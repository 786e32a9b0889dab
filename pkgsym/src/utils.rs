use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use pathdiff::diff_paths;

use crate::constants::BASE_DIRS;

/// Returns the cargo `target` directory as a [`PathBuf`] for the current profile (`debug` or
/// `release`). This works by calling `cargo locate-project` to get the workspace root. Used by the
/// man page and shell completion generators.
///
/// # Errors
///
/// An error is returned if `cargo locate-project` returns a non-zero exit code or prints something
/// that is not a file path.
pub fn get_cargo_target() -> anyhow::Result<PathBuf> {
    #[cfg(debug_assertions)]
    const CARGO_PROFILE: &str = "debug";

    #[cfg(not(debug_assertions))]
    const CARGO_PROFILE: &str = "release";

    let cargo = std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo"));
    let cargo_output = process::Command::new(cargo)
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    if !cargo_output.status.success() {
        if let Some(code) = cargo_output.status.code() {
            anyhow::bail!("cargo locate-project exited with code {code:?}");
        }
        anyhow::bail!("cargo locate-project exited by signal");
    }

    let stdout = String::from_utf8(cargo_output.stdout.trim_ascii_end().to_vec())
        .context("cargo locate-project printed a non UTF-8 path")?;
    let workspace_root = Path::new(&stdout)
        .parent()
        .with_context(|| format!("cargo locate-project printed {stdout:?}, not a file path"))?;

    Ok(workspace_root.join("target").join(CARGO_PROFILE))
}

/// If the [`Path`] reference begins with the users home directory, it is replaced with a `~`. This
/// is kinda the opposite of [`expand_into_pathbuf`] and meant for printing.
///
/// # Arguments
///
/// - `p` - Path reference
pub fn replace_home_with_tilde<P: AsRef<Path>>(p: P) -> String {
    let path = p.as_ref();
    let home = BASE_DIRS.home_dir();
    if let Ok(tail) = path.strip_prefix(home) {
        PathBuf::from("~").join(tail)
    } else {
        path.to_path_buf()
    }
    .to_string_lossy()
    .to_string()
}

/// Show `path` relative to `base` when it lives inside it, otherwise fall back to
/// [`replace_home_with_tilde`].
pub fn display_relative_to<P: AsRef<Path>, B: AsRef<Path>>(path: P, base: B) -> String {
    let path = path.as_ref();
    match diff_paths(path, base.as_ref()) {
        Some(rel) if !rel.starts_with("..") && !rel.as_os_str().is_empty() => {
            rel.to_string_lossy().to_string()
        }
        _ => replace_home_with_tilde(path),
    }
}

/**
Given a reference to a `&str` slice, expand `~` and environment variables, clean path
components, and return as a [`PathBuf`].

# Arguments

- `s` - `&str` slice.

# Errors

An error is returned if an environment variable cannot be found.
*/
pub fn expand_into_pathbuf<S: AsRef<str>>(s: S) -> anyhow::Result<PathBuf> {
    let s = s.as_ref();
    let expanded = expandenv::expand(s).with_context(|| format!("failed to expand {s:?}"))?;
    let cleaned = path_clean::clean(expanded);
    Ok(cleaned)
}
