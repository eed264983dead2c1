//! End-to-end tests for the `toolup` launcher binary.

use rstest::{fixture, rstest};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PINNED: &str = "9.9.9";

struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.home().join("bin").join(version)
    }

    /// Copy the launcher under a managed tool name.
    fn launcher(&self, tool: &str) -> PathBuf {
        let dir = self.temp.path().join("launcher");
        fs::create_dir_all(&dir).expect("create launcher dir");
        let path = dir.join(format!("{tool}{}", std::env::consts::EXE_SUFFIX));
        fs::copy(env!("CARGO_BIN_EXE_toolup"), &path).expect("copy launcher");
        path
    }

    fn run(&self, program: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut command = Command::new(program);
        command.args(args);
        for var in [
            "TOOLUP_TOOLS_VERSION",
            "TOOLUP_CDN_BASE_URL",
            "TOOLUP_LOCK_TIMEOUT",
            "TOOLUP_DOWNLOAD_TIMEOUT",
            "TOOLUP_LOG",
        ] {
            command.env_remove(var);
        }
        command.env("TOOLUP_HOME", self.home());
        command.envs(envs.iter().copied());
        command.output().expect("run launcher")
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    Sandbox {
        temp: tempfile::tempdir().expect("temp dir"),
    }
}

#[rstest]
fn version_argument_prints_version(sandbox: Sandbox) {
    let output = sandbox.run(
        Path::new(env!("CARGO_BIN_EXE_toolup")),
        &["version"],
        &[("TOOLUP_TOOLS_VERSION", PINNED)],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout was not UTF-8");
    assert!(stdout.starts_with("Toolup v"), "unexpected stdout: {stdout}");
    assert!(!sandbox.home().join("bin").exists());
}

#[rstest]
fn unmanaged_program_name_runs_without_update(sandbox: Sandbox) {
    let output = sandbox.run(
        Path::new(env!("CARGO_BIN_EXE_toolup")),
        &["status"],
        &[("TOOLUP_TOOLS_VERSION", PINNED)],
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(!sandbox.home().join("bin").exists());
}

#[rstest]
fn unreachable_server_exits_with_update_failure(sandbox: Sandbox) {
    let tsh = sandbox.launcher("tsh");

    let output = sandbox.run(
        &tsh,
        &["status"],
        &[
            ("TOOLUP_TOOLS_VERSION", PINNED),
            ("TOOLUP_CDN_BASE_URL", "http://127.0.0.1:9"),
            ("TOOLUP_DOWNLOAD_TIMEOUT", "5"),
        ],
    );

    assert_eq!(output.status.code(), Some(125));
    let stderr = String::from_utf8(output.stderr).expect("stderr was not UTF-8");
    assert!(stderr.contains("Updating client tools to v9.9.9"));
    assert!(stderr.contains("(network)"), "unexpected stderr: {stderr}");
    assert!(!sandbox.version_dir(PINNED).exists());
}

#[cfg(target_os = "linux")]
#[rstest]
fn installed_pinned_version_is_launched_with_args(sandbox: Sandbox) {
    use std::os::unix::fs::PermissionsExt;

    let version_dir = sandbox.version_dir(PINNED);
    fs::create_dir_all(&version_dir).expect("create version dir");
    for tool in ["tsh", "tctl"] {
        let script = version_dir.join(tool);
        fs::write(
            &script,
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$TOOLUP_HOME/forwarded\"\nexit 7\n",
        )
        .expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
    let tsh = sandbox.launcher("tsh");

    let output = sandbox.run(
        &tsh,
        &["ls", "--toolup-no-update-not-a-flag", "-v"],
        &[
            ("TOOLUP_TOOLS_VERSION", PINNED),
            ("TOOLUP_CDN_BASE_URL", "http://127.0.0.1:9"),
        ],
    );

    assert_eq!(output.status.code(), Some(7));
    let forwarded =
        fs::read_to_string(sandbox.home().join("forwarded")).expect("read forwarded args");
    assert_eq!(forwarded, "ls\n--toolup-no-update-not-a-flag\n-v\n");
    assert!(!sandbox.home().join("bin").join(".lock").exists());
}
