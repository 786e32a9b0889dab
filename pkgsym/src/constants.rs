use std::sync::LazyLock;

/// Lazy wrapper around [`directories_next::BaseDirs::new`].
pub static BASE_DIRS: LazyLock<directories_next::BaseDirs> = LazyLock::new(|| {
    directories_next::BaseDirs::new().expect("failed to locate user home directory")
});

/// Name of the directory `pkgsym` keeps its config and preferences under.
pub const APP_DIR_NAME: &str = "pkgsym";

/// Manifest every linkable package folder must contain.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Project folder holding the project's own assets. Used to recognize a project root.
pub const ASSETS_DIR_NAME: &str = "Assets";

/// Project folder links are created in.
pub const PACKAGES_DIR_NAME: &str = "Packages";

/// Preference key the recent history is stored under.
pub const RECENT_PREFS_KEY: &str = "PackageSymlinker_Recent";

/// Separator between paths in the persisted recent history.
pub const RECENT_SEPARATOR: char = '#';
