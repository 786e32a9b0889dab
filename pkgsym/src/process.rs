use std::{
    ffi::{OsStr, OsString},
    fmt::Display,
    path::Path,
    process,
};

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProcessError {
    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed ({}): {}", display_code(.code), .stderr.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"))
}

/// Captured result of a finished child process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Human readable command line, for messages only.
    pub command: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command should be considered successful.
    ///
    /// A zero exit code always is. Some platforms report a non-zero code for link commands that
    /// did their job; when `lenient` is set, a non-zero code with nothing on stderr counts as
    /// success too. A process killed by a signal never succeeds.
    pub fn succeeded(&self, lenient: bool) -> bool {
        match self.code {
            Some(0) => true,
            Some(_) => lenient && self.stderr.trim().is_empty(),
            None => false,
        }
    }

    /// Convert into a `Result` using [`Self::succeeded`].
    ///
    /// # Errors
    ///
    /// [`ProcessError::Failed`] if the command did not succeed.
    pub fn into_result(self, lenient: bool) -> Result<Self, ProcessError> {
        if self.succeeded(lenient) {
            Ok(self)
        } else {
            Err(ProcessError::Failed {
                command: self.command,
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Whether non-zero exit codes with an empty stderr are excused on this OS by default. This was
/// only ever observed on macOS.
pub const fn default_lenient_exit_codes() -> bool {
    cfg!(target_os = "macos")
}

/// Render a program and its arguments as one line for messages.
fn command_line<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(AsRef::as_ref))
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `program` with `args`, wait for it to exit and capture both output streams. Nothing is
/// interpolated through a shell unless `program` is one.
///
/// # Arguments
///
/// - `program` - Program to run.
/// - `args` - Arguments, passed as-is.
/// - `cwd` - Working directory, or inherit if `None`.
///
/// # Errors
///
/// [`ProcessError::Spawn`] if the process could not be started. A non-zero exit is _not_ an error
/// here; see [`CommandOutput::into_result`].
pub fn run_command<P, S>(
    program: P,
    args: &[S],
    cwd: Option<&Path>,
) -> Result<CommandOutput, ProcessError>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let command = command_line(program, args);

    let mut cmd = process::Command::new(program);
    cmd.args(args).stdin(process::Stdio::null());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    #[cfg(debug_assertions)]
    eprintln!("running `{command}`");

    let output = cmd.output().map_err(|err| ProcessError::Spawn {
        command: command.clone(),
        source: err,
    })?;

    Ok(CommandOutput {
        command,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Program and leading arguments of the platform command interpreter.
pub fn platform_shell() -> (OsString, Vec<OsString>) {
    #[cfg(windows)]
    {
        (OsString::from("cmd.exe"), vec![OsString::from("/C")])
    }

    #[cfg(not(windows))]
    {
        (OsString::from("/bin/sh"), vec![OsString::from("-c")])
    }
}

/// Run a command line through [`platform_shell`].
///
/// # Errors
///
/// See [`run_command`].
pub fn run_shell<S: Display>(line: S, cwd: Option<&Path>) -> Result<CommandOutput, ProcessError> {
    let (shell, mut args) = platform_shell();
    args.push(OsString::from(line.to_string()));
    run_command(shell, &args, cwd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>, stderr: &str) -> CommandOutput {
        CommandOutput {
            command: "ln -s a b".to_string(),
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_zero_exit_always_succeeds() {
        assert!(output(Some(0), "").succeeded(false));
        assert!(output(Some(0), "some noise").succeeded(false));
        assert!(output(Some(0), "some noise").succeeded(true));
    }

    #[test]
    fn test_non_zero_exit_strict() {
        assert!(!output(Some(1), "").succeeded(false));
        assert!(!output(None, "").succeeded(false));
    }

    #[test]
    fn test_non_zero_exit_lenient() {
        assert!(output(Some(1), "").succeeded(true));
        assert!(output(Some(1), " \r\n").succeeded(true));
        assert!(!output(Some(1), "ln: b: File exists\n").succeeded(true));
        // killed by a signal
        assert!(!output(None, "").succeeded(true));
    }

    #[test]
    fn test_into_result_keeps_stderr() {
        let err = output(Some(1), "ln: b: File exists\n")
            .into_result(true)
            .unwrap_err();
        match err {
            ProcessError::Failed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "ln -s a b");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "ln: b: File exists\n");
            }
            ProcessError::Spawn { .. } => panic!("unexpected spawn error"),
        }
    }

    #[test]
    fn test_spawn_failure() {
        let err = run_command("pkgsym-this-program-does-not-exist", &["--help"], None).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }), "unexpected error: {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_captures_streams() -> anyhow::Result<()> {
        let out = run_shell("echo out; echo err 1>&2; exit 3", None)?;

        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");

        Ok(())
    }
}
