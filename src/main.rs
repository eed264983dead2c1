//! Toolup launcher entrypoint.
//!
//! Invoked as one of the managed client tools (for example through a `tsh`
//! link), this binary resolves the tools version required by policy, installs
//! it when missing, and hands the invocation over to it. The child's exit
//! code is returned verbatim; `125` reports a failure of the update mechanism
//! itself.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::path::Path;
use toolup_updater::artefact::download::HttpFetcher;
use toolup_updater::artefact::extraction::extractor_for;
use toolup_updater::config::{Config, SystemEnv};
use toolup_updater::dirs::{BaseDirs, NoBaseDirs, SystemBaseDirs};
use toolup_updater::error::UpdateError;
use toolup_updater::output::{failure_message, write_stderr_line};
use toolup_updater::reexec::Reexecutor;
use toolup_updater::update::{UpdateDecision, Updater};
use tracing_subscriber::EnvFilter;

/// Version reported by this build, overridable at release time.
const VERSION: &str = match option_env!("TOOLUP_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Argument that skips the update flow; it is never forwarded.
const NO_UPDATE_FLAG: &str = "--toolup-no-update";

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TOOLUP_LOG";

/// Exit code for a failed update when no usable version exists.
const UPDATE_FAILURE_EXIT_CODE: i32 = 125;

/// Tool name used when the program name cannot be determined.
const FALLBACK_TOOL: &str = "toolup";

fn main() {
    init_logging();
    let args: Vec<OsString> = std::env::args_os().collect();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let exit_code = run(&args, &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init()
        .is_err()
    {
        // A global subscriber is already installed.
    }
}

fn run(args: &[OsString], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let (program, rest) = match args.split_first() {
        Some((program, rest)) => (Some(program.as_os_str()), rest),
        None => (None, args),
    };

    if rest.first().is_some_and(|arg| arg == "version") {
        if writeln!(stdout, "Toolup v{VERSION}").is_err() {
            // Best-effort output; ignore write failures.
        }
        return 0;
    }

    let (forwarded, skip_update) = strip_update_flags(rest);
    if skip_update {
        log::debug!("{NO_UPDATE_FLAG} given; skipping update");
        return 0;
    }

    let tool = tool_name(program);
    let Some(config) = load_config() else {
        return 0;
    };
    let fetcher = HttpFetcher::new(config.base_url(), config.download_timeout());
    let extractor = extractor_for(config.platform().os().package_format());
    let updater = Updater::new(&config, &fetcher, extractor.as_ref());

    match updater.prepare(&tool, stderr) {
        Ok(UpdateDecision::RunCurrent) => 0,
        Ok(UpdateDecision::Reexec { version, binary }) => {
            log::debug!("handing {tool} over to {version}");
            let env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
            match Reexecutor.run(binary.as_std_path(), &forwarded, &env) {
                Ok(code) => code,
                Err(err) => report_failure(stderr, &UpdateError::from(err)),
            }
        }
        Err(err) => report_failure(stderr, &err),
    }
}

fn load_config() -> Option<Config> {
    let dirs: Box<dyn BaseDirs> = match SystemBaseDirs::new() {
        Some(dirs) => Box::new(dirs),
        None => Box::new(NoBaseDirs),
    };
    match Config::from_env(&SystemEnv, dirs.as_ref(), VERSION) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("skipping client tools update: {err}");
            None
        }
    }
}

fn report_failure(stderr: &mut dyn Write, err: &UpdateError) -> i32 {
    write_stderr_line(stderr, failure_message(err.category(), err));
    UPDATE_FAILURE_EXIT_CODE
}

/// Remove update-control flags, reporting whether the update was disabled.
fn strip_update_flags(args: &[OsString]) -> (Vec<OsString>, bool) {
    let skip_update = args.iter().any(|arg| arg == NO_UPDATE_FLAG);
    let forwarded = args
        .iter()
        .filter(|arg| *arg != NO_UPDATE_FLAG)
        .cloned()
        .collect();
    (forwarded, skip_update)
}

/// Derive the managed tool name from the program path, so that `tsh.exe`
/// and `/usr/local/bin/tsh` both yield `tsh`.
fn tool_name(program: Option<&OsStr>) -> String {
    program
        .and_then(|path| Path::new(path).file_stem())
        .and_then(OsStr::to_str)
        .unwrap_or(FALLBACK_TOOL)
        .to_owned()
}
