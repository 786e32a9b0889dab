use std::{
    ffi::OsStr,
    fmt::Display,
    path::{Component, Path, PathBuf},
};

use colored::Colorize;

use crate::{
    backend::{LinkBackend, is_link},
    error::{LinkError, RecentError, ScanError, UnlinkError},
    links::{LinkedPackage, scan_links},
    manifest::PackageManifest,
    prefs::PrefsStore,
    project::Project,
    recent::{RecentEntry, RecentHistory},
    refresh::HostRefresh,
    utils::replace_home_with_tilde,
};

/// A validated link that has not been created yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedLink {
    /// Absolute path of the package folder.
    pub source: PathBuf,
    /// Where the link will be created.
    pub dest: PathBuf,
    /// Manifest of `source`.
    pub manifest: PackageManifest,
}

impl Display for PlannedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            source,
            dest,
            manifest,
        } = self;
        write!(
            f,
            "{} ({}) -> {}",
            replace_home_with_tilde(dest).cyan(),
            manifest.to_string().bold(),
            replace_home_with_tilde(source).bright_green(),
        )
    }
}

/// Whether `name` can be used as a single folder name inside `Packages`.
fn is_single_component(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == OsStr::new(name)
    )
}

/// Links packages into one project and keeps track of what was linked recently.
///
/// Every operation leaves the previous state untouched when it fails. After a successful link or
/// unlink the host is refreshed; failures at that point are only reported as warnings since the
/// link change has already happened.
#[derive(Debug)]
pub struct Symlinker<B, P, R> {
    project: Project,
    backend: B,
    recent: RecentHistory<P>,
    refresh: R,
}

impl<B, P, R> Symlinker<B, P, R>
where
    B: LinkBackend,
    P: PrefsStore,
    R: HostRefresh,
{
    pub fn new(project: Project, backend: B, recent: RecentHistory<P>, refresh: R) -> Self {
        Self {
            project,
            backend,
            recent,
            refresh,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn recent(&self) -> &RecentHistory<P> {
        &self.recent
    }

    pub fn host_refresh(&self) -> &R {
        &self.refresh
    }

    /// Validate that `source` can be linked into the project.
    ///
    /// Checks, in order: the path is not empty, it has a `package.json`, the manifest parses and
    /// has a usable name, and `Packages/<name>` does not exist yet.
    ///
    /// # Errors
    ///
    /// The first failed check is returned as a [`LinkError`].
    pub fn plan_link<S: AsRef<Path>>(&self, source: S) -> Result<PlannedLink, LinkError> {
        let source = source.as_ref();
        if source.as_os_str().is_empty() {
            return Err(LinkError::NoFolderSelected);
        }

        let manifest = PackageManifest::try_from_dir(source)?;

        if !is_single_component(&manifest.name) {
            return Err(LinkError::InvalidName(manifest.name));
        }

        let source = dunce::canonicalize(source).map_err(|err| LinkError::Source {
            source: err,
            path: source.to_path_buf(),
        })?;

        let dest = self.project.link_path(&manifest.name);
        // symlink_metadata so that dangling links count as existing
        if dest.symlink_metadata().is_ok() {
            return Err(LinkError::DestinationExists(dest));
        }

        Ok(PlannedLink {
            source,
            dest,
            manifest,
        })
    }

    /// Create the link described by `plan`, remember its source and refresh the host.
    ///
    /// # Errors
    ///
    /// [`LinkError::DestinationExists`] if something appeared at the destination since planning,
    /// or [`LinkError::Backend`] if the link could not be created.
    pub fn link(&mut self, plan: &PlannedLink) -> Result<(), LinkError> {
        let PlannedLink { source, dest, .. } = plan;

        if dest.symlink_metadata().is_ok() {
            return Err(LinkError::DestinationExists(dest.clone()));
        }

        self.backend.create_link(source, dest)?;

        if let Err(err) = self.recent.add(source) {
            eprintln!(
                "{}: not added to recent packages: {err}",
                "warn".yellow()
            );
        }
        self.refresh_host();

        Ok(())
    }

    /// [`Self::plan_link`] followed by [`Self::link`].
    ///
    /// # Errors
    ///
    /// See [`Self::plan_link`] and [`Self::link`].
    pub fn link_package<S: AsRef<Path>>(&mut self, source: S) -> Result<PlannedLink, LinkError> {
        let plan = self.plan_link(source)?;
        self.link(&plan)?;
        Ok(plan)
    }

    /// Source folder of the recent entry at `index` (1-based, oldest first).
    ///
    /// # Errors
    ///
    /// [`LinkError::NoRecentEntry`] if there is no such entry, [`LinkError::Recent`] if the
    /// history cannot be read.
    pub fn recent_source(&self, index: usize) -> Result<PathBuf, LinkError> {
        let paths = self.recent.load()?;
        index
            .checked_sub(1)
            .and_then(|i| paths.get(i))
            .cloned()
            .ok_or(LinkError::NoRecentEntry(index))
    }

    /// Turn a user supplied link into a path. A bare name that exists in `Packages` is taken
    /// from there; anything else is used as a path.
    pub fn resolve_link_arg<S: AsRef<Path>>(&self, arg: S) -> PathBuf {
        let arg = arg.as_ref();
        if let Some(name) = arg.to_str().filter(|name| is_single_component(name)) {
            let candidate = self.project.link_path(name);
            if candidate.symlink_metadata().is_ok() {
                return candidate;
            }
        }

        arg.to_path_buf()
    }

    /// Validate that `link` is an existing link that can be removed.
    ///
    /// # Errors
    ///
    /// [`UnlinkError::LinkNotFound`] if nothing exists at `link`, [`UnlinkError::OutsidePackages`]
    /// if it is not directly inside the project's `Packages` folder, [`UnlinkError::NotALink`] if
    /// it is a regular file or folder.
    pub fn plan_unlink<S: AsRef<Path>>(&self, link: S) -> Result<PathBuf, UnlinkError> {
        let link = link.as_ref();
        if link.symlink_metadata().is_err() {
            return Err(UnlinkError::LinkNotFound(link.to_path_buf()));
        }
        if !self.is_in_packages_dir(link) {
            return Err(UnlinkError::OutsidePackages(link.to_path_buf()));
        }
        if !is_link(link) {
            return Err(UnlinkError::NotALink(link.to_path_buf()));
        }

        Ok(link.to_path_buf())
    }

    /// Whether `link` sits directly in `Packages`. Only the parent folders are canonicalized so
    /// the link itself is never followed.
    fn is_in_packages_dir(&self, link: &Path) -> bool {
        let parent = match link.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => return false,
        };

        match (
            dunce::canonicalize(parent),
            dunce::canonicalize(self.project.packages_dir()),
        ) {
            (Ok(parent), Ok(packages_dir)) => parent == packages_dir,
            _ => false,
        }
    }

    /// Remove the link at `link` and refresh the host. The link's source is never touched.
    ///
    /// # Errors
    ///
    /// See [`Self::plan_unlink`], plus [`UnlinkError::Backend`] if removal fails.
    pub fn unlink<S: AsRef<Path>>(&mut self, link: S) -> Result<(), UnlinkError> {
        let link = self.plan_unlink(link)?;
        self.backend.remove_link(&link)?;
        self.refresh_host();

        Ok(())
    }

    /// Rescan `Packages` for links.
    ///
    /// # Errors
    ///
    /// An error is returned if the packages folder cannot be read.
    pub fn linked_packages(&self) -> Result<Vec<LinkedPackage>, ScanError> {
        scan_links(&self.project.packages_dir(), &self.backend)
    }

    /// Whether a package called `name` is currently linked.
    ///
    /// # Errors
    ///
    /// See [`Self::linked_packages`].
    pub fn is_linked(&self, name: &str) -> Result<bool, ScanError> {
        Ok(self
            .linked_packages()?
            .iter()
            .any(|linked| linked.name() == Some(name)))
    }

    /// Recently linked folders, oldest first.
    ///
    /// # Errors
    ///
    /// An error is returned if the history cannot be read.
    pub fn recent_entries(&self) -> Result<Vec<RecentEntry>, RecentError> {
        self.recent.entries()
    }

    /// Forget all recently linked folders.
    ///
    /// # Errors
    ///
    /// An error is returned if the history cannot be written.
    pub fn clear_recent(&mut self) -> Result<(), RecentError> {
        self.recent.clear()
    }

    fn refresh_host(&self) {
        if let Err(err) = self.refresh.refresh(&self.project) {
            eprintln!("{}: failed to refresh project: {err}", "warn".yellow());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Context;
    use tempfile::TempDir;

    use crate::{
        backend::{LinkSource, NativeBackend},
        manifest::error::ManifestError,
        prefs::{FilePrefs, MemoryPrefs},
        test_utils::{
            CountingRefresh, RecordingBackend, make_tmp_package, make_tmp_project,
            write_manifest,
        },
    };

    use super::*;

    type TestSymlinker = Symlinker<RecordingBackend, MemoryPrefs, CountingRefresh>;

    fn make_symlinker() -> anyhow::Result<(TempDir, TestSymlinker)> {
        let project_dir = make_tmp_project().context("failed to make test project")?;
        let project = Project::at(project_dir.path())?;
        let symlinker = Symlinker::new(
            project,
            RecordingBackend::default(),
            RecentHistory::new(MemoryPrefs::default(), 0),
            CountingRefresh::default(),
        );

        Ok((project_dir, symlinker))
    }

    #[test]
    fn test_is_single_component() {
        assert!(is_single_component("com.example.foo"));
        assert!(is_single_component("foo bar"));
        assert!(!is_single_component(""));
        assert!(!is_single_component("."));
        assert!(!is_single_component(".."));
        assert!(!is_single_component("../escape"));
        assert!(!is_single_component("a/b"));
        assert!(!is_single_component("a\\b"));
        assert!(!is_single_component("/abs"));
    }

    #[test]
    fn test_link_then_list() -> anyhow::Result<()> {
        let (project_dir, mut symlinker) = make_symlinker()?;
        let package = make_tmp_package("com.example.foo", Some("1.2.0"))?;

        let plan = symlinker.link_package(package.path())?;

        let expected_dest = project_dir.path().join("Packages").join("com.example.foo");
        assert_eq!(plan.dest, expected_dest);
        assert_eq!(plan.source, dunce::canonicalize(package.path())?);

        let linked = symlinker.linked_packages()?;
        assert_eq!(linked.len(), 1, "unexpected links: {linked:#?}");
        assert_eq!(linked[0].name(), Some("com.example.foo"));
        assert_eq!(linked[0].version(), Some("1.2.0"));
        assert_eq!(linked[0].link_path, expected_dest);
        assert_eq!(linked[0].source, LinkSource::Resolved(plan.source.clone()));
        assert!(symlinker.is_linked("com.example.foo")?);

        assert_eq!(symlinker.recent().load()?, vec![plan.source]);
        assert_eq!(symlinker.backend().created(), 1);
        assert_eq!(symlinker.host_refresh().count(), 1);

        Ok(())
    }

    #[test]
    fn test_link_existing_destination() -> anyhow::Result<()> {
        let (project_dir, mut symlinker) = make_symlinker()?;
        let package = make_tmp_package("com.example.foo", Some("1.2.0"))?;
        // an embedded package with the same name already lives in the project
        let embedded = project_dir.path().join("Packages").join("com.example.foo");
        fs::create_dir(&embedded)?;
        write_manifest(&embedded, "com.example.foo", Some("0.9.0"))?;

        let err = symlinker.link_package(package.path()).unwrap_err();

        assert!(
            matches!(err, LinkError::DestinationExists(ref p) if *p == embedded),
            "unexpected error: {err:?}"
        );
        assert_eq!(symlinker.backend().created(), 0);
        assert!(symlinker.recent().load()?.is_empty());
        assert!(symlinker.linked_packages()?.is_empty());
        assert_eq!(symlinker.host_refresh().count(), 0);

        Ok(())
    }

    #[test]
    fn test_link_twice() -> anyhow::Result<()> {
        let (_project_dir, mut symlinker) = make_symlinker()?;
        let package = make_tmp_package("com.example.foo", None)?;

        symlinker.link_package(package.path())?;
        let err = symlinker.link_package(package.path()).unwrap_err();

        assert!(
            matches!(err, LinkError::DestinationExists(_)),
            "unexpected error: {err:?}"
        );
        assert_eq!(symlinker.backend().created(), 1);
        assert_eq!(symlinker.linked_packages()?.len(), 1);

        Ok(())
    }

    #[test]
    fn test_link_validation_order() -> anyhow::Result<()> {
        let (_project_dir, mut symlinker) = make_symlinker()?;

        let err = symlinker.link_package("").unwrap_err();
        assert!(matches!(err, LinkError::NoFolderSelected), "unexpected error: {err:?}");

        let no_manifest = tempfile::tempdir()?;
        let err = symlinker.link_package(no_manifest.path()).unwrap_err();
        assert!(
            matches!(err, LinkError::Manifest(ManifestError::NotFound(_))),
            "unexpected error: {err:?}"
        );

        let empty_name = tempfile::tempdir()?;
        fs::write(
            empty_name.path().join("package.json"),
            r#"{"name":"","version":"1.0.0"}"#,
        )?;
        let err = symlinker.link_package(empty_name.path()).unwrap_err();
        assert!(
            matches!(err, LinkError::Manifest(ManifestError::EmptyName(_))),
            "unexpected error: {err:?}"
        );

        let escaping = make_tmp_package("../../escape", None)?;
        let err = symlinker.link_package(escaping.path()).unwrap_err();
        assert!(matches!(err, LinkError::InvalidName(_)), "unexpected error: {err:?}");

        assert_eq!(symlinker.backend().created(), 0);
        assert!(symlinker.recent().load()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_plan_link_does_not_mutate() -> anyhow::Result<()> {
        let (_project_dir, symlinker) = make_symlinker()?;
        let package = make_tmp_package("com.example.foo", Some("1.2.0"))?;

        let plan = symlinker.plan_link(package.path())?;

        assert_eq!(plan.manifest.name, "com.example.foo");
        assert!(!plan.dest.exists());
        assert_eq!(symlinker.backend().created(), 0);
        assert!(symlinker.recent().load()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_unlink_only_removes_target() -> anyhow::Result<()> {
        let (_project_dir, mut symlinker) = make_symlinker()?;
        let foo = make_tmp_package("com.example.foo", Some("1.2.0"))?;
        let bar = make_tmp_package("com.example.bar", Some("2.0.0"))?;

        let foo_plan = symlinker.link_package(foo.path())?;
        symlinker.link_package(bar.path())?;

        symlinker.unlink(&foo_plan.dest)?;

        let linked = symlinker.linked_packages()?;
        assert_eq!(linked.len(), 1, "unexpected links: {linked:#?}");
        assert_eq!(linked[0].name(), Some("com.example.bar"));
        assert!(
            foo.path().join("package.json").exists(),
            "unlinking removed the package source"
        );
        assert_eq!(symlinker.backend().removed(), 1);
        assert_eq!(symlinker.host_refresh().count(), 3);

        Ok(())
    }

    #[test]
    fn test_unlink_by_name() -> anyhow::Result<()> {
        let (_project_dir, mut symlinker) = make_symlinker()?;
        let foo = make_tmp_package("com.example.foo", None)?;
        let plan = symlinker.link_package(foo.path())?;

        let resolved = symlinker.resolve_link_arg("com.example.foo");
        assert_eq!(resolved, plan.dest);

        symlinker.unlink(resolved)?;
        assert!(symlinker.linked_packages()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_unlink_rejects_real_dirs() -> anyhow::Result<()> {
        let (project_dir, mut symlinker) = make_symlinker()?;
        let embedded = project_dir.path().join("Packages").join("com.example.embedded");
        fs::create_dir(&embedded)?;

        let err = symlinker.unlink(&embedded).unwrap_err();
        assert!(matches!(err, UnlinkError::NotALink(_)), "unexpected error: {err:?}");

        let err = symlinker
            .unlink(project_dir.path().join("Packages").join("missing"))
            .unwrap_err();
        assert!(matches!(err, UnlinkError::LinkNotFound(_)), "unexpected error: {err:?}");

        assert!(embedded.is_dir());
        assert_eq!(symlinker.backend().removed(), 0);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unlink_rejects_links_outside_packages() -> anyhow::Result<()> {
        let (project_dir, mut symlinker) = make_symlinker()?;
        let target = make_tmp_package("com.example.foo", None)?;
        let unrelated = project_dir.path().join("home_config_link");
        std::os::unix::fs::symlink(target.path(), &unrelated)?;

        let err = symlinker.unlink(&unrelated).unwrap_err();
        assert!(
            matches!(err, UnlinkError::OutsidePackages(_)),
            "unexpected error: {err:?}"
        );

        // nested below Packages is not managed either
        let nested_dir = project_dir.path().join("Packages").join("com.example.embedded");
        fs::create_dir(&nested_dir)?;
        let nested = nested_dir.join("link");
        std::os::unix::fs::symlink(target.path(), &nested)?;
        let err = symlinker.unlink(&nested).unwrap_err();
        assert!(
            matches!(err, UnlinkError::OutsidePackages(_)),
            "unexpected error: {err:?}"
        );

        assert!(unrelated.symlink_metadata().is_ok());
        assert!(nested.symlink_metadata().is_ok());
        assert_eq!(symlinker.backend().removed(), 0);

        Ok(())
    }

    #[test]
    fn test_recent_source_reports_unreadable_history() -> anyhow::Result<()> {
        let project_dir = make_tmp_project().context("failed to make test project")?;
        let prefs_path = project_dir.path().join("prefs.toml");
        fs::write(&prefs_path, "this is = = not toml")?;
        let symlinker = Symlinker::new(
            Project::at(project_dir.path())?,
            RecordingBackend::default(),
            RecentHistory::new(FilePrefs::new(&prefs_path), 0),
            CountingRefresh::default(),
        );

        let err = symlinker.recent_source(1).unwrap_err();
        assert!(
            matches!(err, LinkError::Recent(RecentError::Prefs(_))),
            "unexpected error: {err:?}"
        );

        Ok(())
    }

    #[test]
    fn test_recent_source_and_clear() -> anyhow::Result<()> {
        let (_project_dir, mut symlinker) = make_symlinker()?;
        let foo = make_tmp_package("com.example.foo", None)?;
        let bar = make_tmp_package("com.example.bar", None)?;
        let foo_plan = symlinker.link_package(foo.path())?;
        let bar_plan = symlinker.link_package(bar.path())?;

        assert_eq!(symlinker.recent_source(1)?, foo_plan.source);
        assert_eq!(symlinker.recent_source(2)?, bar_plan.source);
        assert!(matches!(
            symlinker.recent_source(0),
            Err(LinkError::NoRecentEntry(0))
        ));
        assert!(matches!(
            symlinker.recent_source(3),
            Err(LinkError::NoRecentEntry(3))
        ));

        let entries = symlinker.recent_entries()?;
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1].manifest.as_ref().map(|m| m.name.as_str()),
            Some("com.example.bar")
        );

        symlinker.clear_recent()?;
        assert!(symlinker.recent_entries()?.is_empty());
        // clearing history does not touch links
        assert_eq!(symlinker.linked_packages()?.len(), 2);

        Ok(())
    }

    #[test]
    fn test_relink_moves_recent_to_end() -> anyhow::Result<()> {
        let project_dir = make_tmp_project()?;
        let mut symlinker = Symlinker::new(
            Project::at(project_dir.path())?,
            NativeBackend,
            RecentHistory::new(MemoryPrefs::default(), 0),
            CountingRefresh::default(),
        );
        let foo = make_tmp_package("com.example.foo", None)?;
        let bar = make_tmp_package("com.example.bar", None)?;

        let foo_plan = symlinker.link_package(foo.path())?;
        let bar_plan = symlinker.link_package(bar.path())?;
        symlinker.unlink(&foo_plan.dest)?;
        symlinker.link_package(foo.path())?;

        assert_eq!(
            symlinker.recent().load()?,
            vec![bar_plan.source, foo_plan.source]
        );

        Ok(())
    }
}
