use crate::{
    process::{ProcessError, run_shell},
    project::Project,
};

/// Lets the host (the editor owning the project) know the `Packages` folder changed.
pub trait HostRefresh {
    /// Called after every successful link or unlink.
    ///
    /// # Errors
    ///
    /// An error is returned if the host could not be notified. The link change itself has already
    /// happened at that point.
    fn refresh(&self, project: &Project) -> Result<(), ProcessError>;
}

impl<R: HostRefresh + ?Sized> HostRefresh for Box<R> {
    fn refresh(&self, project: &Project) -> Result<(), ProcessError> {
        (**self).refresh(project)
    }
}

/// Does nothing; the host picks up changes on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRefresh;

impl HostRefresh for NoRefresh {
    fn refresh(&self, _project: &Project) -> Result<(), ProcessError> {
        Ok(())
    }
}

/// Runs a user supplied command line through the platform shell, inside the project root.
#[derive(Clone, Debug)]
pub struct CommandRefresh {
    pub command: String,
    pub lenient: bool,
}

impl HostRefresh for CommandRefresh {
    fn refresh(&self, project: &Project) -> Result<(), ProcessError> {
        run_shell(&self.command, Some(project.root()))?.into_result(self.lenient)?;
        Ok(())
    }
}
