#![cfg(test)]

use std::{cell::Cell, fs, path::Path};

use anyhow::Context;
use tempfile::TempDir;

use crate::{
    backend::{BackendError, LinkBackend, LinkSource, NativeBackend},
    constants::{ASSETS_DIR_NAME, MANIFEST_FILE_NAME, PACKAGES_DIR_NAME},
    process::ProcessError,
    project::Project,
    refresh::HostRefresh,
};

/// Write a `package.json` into `dir`.
pub fn write_manifest(dir: &Path, name: &str, version: Option<&str>) -> anyhow::Result<()> {
    let mut manifest = serde_json::json!({
        "name": name,
        "displayName": "Test package",
        "unity": "2021.3",
    });
    if let Some(version) = version {
        manifest["version"] = serde_json::Value::from(version);
    }

    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("failed to write test manifest '{}'", manifest_path.display()))
}

/// Creates a new temporary package folder, outside of any project:
///
/// ```text
/// <tempdir>
/// ├── Runtime
/// │   └── Foo.cs
/// └── package.json
/// ```
pub fn make_tmp_package(name: &str, version: Option<&str>) -> anyhow::Result<TempDir> {
    let temp_dir = tempfile::tempdir().context("failed to create tempdir")?;
    let root = temp_dir.path();
    let runtime = root.join("Runtime");
    fs::create_dir_all(&runtime)
        .with_context(|| format!("failed to create test dir '{}'", runtime.display()))?;
    fs::write(runtime.join("Foo.cs"), "public class Foo {}")
        .context("failed to create test source file")?;
    write_manifest(root, name, version)?;

    Ok(temp_dir)
}

/// Creates a new temporary, empty project:
///
/// ```text
/// <tempdir>
/// ├── Assets
/// └── Packages
///     └── manifest.json
/// ```
pub fn make_tmp_project() -> anyhow::Result<TempDir> {
    let temp_dir = tempfile::tempdir().context("failed to create tempdir")?;
    let root = temp_dir.path();
    fs::create_dir(root.join(ASSETS_DIR_NAME)).context("failed to create Assets")?;
    let packages = root.join(PACKAGES_DIR_NAME);
    fs::create_dir(&packages).context("failed to create Packages")?;
    fs::write(packages.join("manifest.json"), r#"{"dependencies":{}}"#)
        .context("failed to create project manifest")?;

    Ok(temp_dir)
}

/// [`NativeBackend`] that counts how often it was asked to create or remove a link.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    created: Cell<usize>,
    removed: Cell<usize>,
}

impl RecordingBackend {
    pub fn created(&self) -> usize {
        self.created.get()
    }

    pub fn removed(&self) -> usize {
        self.removed.get()
    }
}

impl LinkBackend for RecordingBackend {
    fn create_link(&self, source: &Path, link: &Path) -> Result<(), BackendError> {
        self.created.set(self.created.get() + 1);
        NativeBackend.create_link(source, link)
    }

    fn remove_link(&self, link: &Path) -> Result<(), BackendError> {
        self.removed.set(self.removed.get() + 1);
        NativeBackend.remove_link(link)
    }

    fn read_source(&self, link: &Path) -> LinkSource {
        NativeBackend.read_source(link)
    }
}

/// Host refresh that only counts calls.
#[derive(Debug, Default)]
pub struct CountingRefresh {
    count: Cell<usize>,
}

impl CountingRefresh {
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl HostRefresh for CountingRefresh {
    fn refresh(&self, _project: &Project) -> Result<(), ProcessError> {
        self.count.set(self.count.get() + 1);
        Ok(())
    }
}
