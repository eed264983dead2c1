//! Hand-over to the resolved tool binary.
//!
//! The child inherits stdin, stdout, and stderr, receives the caller's
//! arguments and environment verbatim, and its exit status becomes ours.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Errors arising from launching the resolved binary.
#[derive(Debug, thiserror::Error)]
pub enum ReexecError {
    /// The binary does not exist.
    #[error("tool binary not found: {path}")]
    NotFound {
        /// The binary path.
        path: PathBuf,
    },

    /// The binary is not executable by the current user.
    #[error("permission denied launching {path}")]
    PermissionDenied {
        /// The binary path.
        path: PathBuf,
    },

    /// The binary could not be launched or waited on.
    #[error("failed to run {path}: {source}")]
    Spawn {
        /// The binary path.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Result type for re-execution.
pub type Result<T> = std::result::Result<T, ReexecError>;

/// Exit code reported when a child ends without a code or signal.
const UNKNOWN_EXIT_CODE: i32 = 1;
/// Offset added to a terminating signal number, as shells report it.
#[cfg(unix)]
const SIGNAL_EXIT_BASE: i32 = 128;

/// Launches a tool binary as a child process and waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reexecutor;

impl Reexecutor {
    /// Run `binary` with `args` and exactly the environment `env`, returning
    /// the child's exit code.
    ///
    /// A non-zero exit is a normal result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ReexecError`] when the child cannot be launched.
    pub fn run(
        &self,
        binary: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> Result<i32> {
        log::debug!("re-executing {}", binary.display());
        let status = Command::new(binary)
            .args(args)
            .env_clear()
            .envs(env.iter().map(|(key, value)| (key, value)))
            .status()
            .map_err(|source| launch_error(binary, source))?;
        Ok(exit_code(status))
    }
}

fn launch_error(binary: &Path, source: io::Error) -> ReexecError {
    let path = binary.to_path_buf();
    match source.kind() {
        io::ErrorKind::NotFound => ReexecError::NotFound { path },
        io::ErrorKind::PermissionDenied => ReexecError::PermissionDenied { path },
        _ => ReexecError::Spawn { path, source },
    }
}

/// Map a child's exit status to a process exit code.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_code(status).unwrap_or(UNKNOWN_EXIT_CODE)
}

#[cfg(unix)]
fn signal_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;

    status.signal().map(|signal| SIGNAL_EXIT_BASE + signal)
}

#[cfg(not(unix))]
fn signal_code(_status: ExitStatus) -> Option<i32> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::process::ExitStatusExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    fn path_env() -> Vec<(OsString, OsString)> {
        std::env::var_os("PATH")
            .map(|path| vec![(OsString::from("PATH"), path)])
            .unwrap_or_default()
    }

    #[test]
    fn propagates_child_exit_code() {
        let temp = tempfile::tempdir().expect("temp dir");
        let binary = script(temp.path(), "tsh", "exit 7");

        let code = Reexecutor.run(&binary, &[], &path_env()).expect("launch");

        assert_eq!(code, 7);
    }

    #[test]
    fn forwards_arguments_and_environment() {
        let temp = tempfile::tempdir().expect("temp dir");
        let out = temp.path().join("out");
        let binary = script(
            temp.path(),
            "tsh",
            &format!("printf '%s|%s|%s' \"$1\" \"$2\" \"$TOOLUP_PROBE\" > '{}'", out.display()),
        );
        let mut env = path_env();
        env.push((OsString::from("TOOLUP_PROBE"), OsString::from("seen")));

        let args = [OsString::from("login"), OsString::from("--proxy=example.com")];
        let code = Reexecutor.run(&binary, &args, &env).expect("launch");

        assert_eq!(code, 0);
        assert_eq!(
            fs::read_to_string(out).expect("read output"),
            "login|--proxy=example.com|seen"
        );
    }

    #[test]
    fn missing_binary_is_not_found() {
        let temp = tempfile::tempdir().expect("temp dir");

        let result = Reexecutor.run(&temp.path().join("tsh"), &[], &[]);

        assert!(matches!(result, Err(ReexecError::NotFound { .. })));
    }

    #[test]
    fn non_executable_binary_is_permission_denied() {
        let temp = tempfile::tempdir().expect("temp dir");
        let binary = temp.path().join("tsh");
        fs::write(&binary, "#!/bin/sh\n").expect("write file");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o644)).expect("chmod");

        let result = Reexecutor.run(&binary, &[], &[]);

        assert!(matches!(result, Err(ReexecError::PermissionDenied { .. })));
    }

    #[test]
    fn signal_maps_to_shell_convention() {
        let status = ExitStatus::from_raw(libc::SIGKILL);

        assert_eq!(exit_code(status), 128 + libc::SIGKILL);
    }
}
