//! Unit tests for archive extraction.

use super::*;
use crate::test_utils::{failure_output, success_output, tar_gz_archive, zip_archive};
use rstest::{fixture, rstest};
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    _temp: TempDir,
    archive: PathBuf,
    dest: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let temp = tempfile::tempdir().expect("temp dir");
    let archive = temp.path().join("artefact");
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).expect("create dest");
    Workspace {
        _temp: temp,
        archive,
        dest,
    }
}

fn tools() -> Vec<String> {
    vec!["tsh".to_owned(), "tctl".to_owned()]
}

#[rstest]
fn tar_gz_extracts_expected_entries_flat(workspace: Workspace) {
    let bytes = tar_gz_archive(&[
        ("toolup/tsh", "tsh binary"),
        ("toolup/tctl", "tctl binary"),
        ("toolup/README", "docs"),
    ]);
    fs::write(&workspace.archive, bytes).expect("write archive");

    let extracted = TarGzExtractor
        .extract(&workspace.archive, &workspace.dest, &tools())
        .expect("extraction succeeds");

    assert_eq!(extracted, tools());
    let tsh = fs::read(workspace.dest.join("tsh")).expect("read tsh");
    assert_eq!(tsh, b"tsh binary");
    assert!(workspace.dest.join("tctl").is_file());
    assert!(!workspace.dest.join("README").exists());
    assert!(!workspace.dest.join("toolup").exists());
}

#[rstest]
fn tar_gz_rejects_parent_traversal(workspace: Workspace) {
    let bytes = tar_gz_archive(&[("tsh", "ok"), ("../tctl", "escape")]);
    fs::write(&workspace.archive, bytes).expect("write archive");

    let result = TarGzExtractor.extract(&workspace.archive, &workspace.dest, &tools());

    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    let parent = workspace.dest.parent().expect("dest has parent");
    assert!(!parent.join("tctl").exists());
}

#[rstest]
fn tar_gz_reports_missing_entries(workspace: Workspace) {
    let bytes = tar_gz_archive(&[("tsh", "only tsh")]);
    fs::write(&workspace.archive, bytes).expect("write archive");

    let result = TarGzExtractor.extract(&workspace.archive, &workspace.dest, &tools());

    match result {
        Err(ExtractionError::MissingEntries { missing }) => {
            assert_eq!(missing, vec!["tctl".to_owned()]);
        }
        other => panic!("expected MissingEntries, got {other:?}"),
    }
}

#[rstest]
fn tar_gz_rejects_garbage(workspace: Workspace) {
    fs::write(&workspace.archive, b"definitely not gzip").expect("write archive");

    let result = TarGzExtractor.extract(&workspace.archive, &workspace.dest, &tools());

    assert!(matches!(result, Err(ExtractionError::Malformed { .. })));
}

#[rstest]
fn zip_extracts_windows_binaries(workspace: Workspace) {
    let bytes = zip_archive(&[
        ("tsh.exe", "tsh"),
        ("tctl.exe", "tctl"),
        ("tbot.exe", "tbot"),
    ]);
    fs::write(&workspace.archive, bytes).expect("write archive");
    let expected = vec!["tsh.exe".to_owned(), "tctl.exe".to_owned()];

    let extracted = ZipExtractor
        .extract(&workspace.archive, &workspace.dest, &expected)
        .expect("extraction succeeds");

    assert_eq!(extracted, expected);
    assert!(workspace.dest.join("tsh.exe").is_file());
    assert!(!workspace.dest.join("tbot.exe").exists());
}

#[rstest]
fn zip_rejects_parent_traversal(workspace: Workspace) {
    let bytes = zip_archive(&[("../tsh.exe", "escape")]);
    fs::write(&workspace.archive, bytes).expect("write archive");

    let result = ZipExtractor.extract(&workspace.archive, &workspace.dest, &["tsh.exe".to_owned()]);

    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
}

#[rstest]
#[case::parent("a/../../etc/passwd")]
#[case::absolute("/etc/passwd")]
fn validate_entry_path_rejects_escapes(#[case] path: &str) {
    let result = validate_entry_path(Path::new(path));
    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
}

#[rstest]
#[case::flat("tsh")]
#[case::nested("toolup/bin/tsh")]
#[case::current_dir("./tsh")]
fn validate_entry_path_accepts_relative_paths(#[case] path: &str) {
    assert!(validate_entry_path(Path::new(path)).is_ok());
}

#[rstest]
fn pkg_copies_expanded_bundles(workspace: Workspace) {
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|program, args| {
            program == "pkgutil" && args.first().is_some_and(|a| a == "--expand-full")
        })
        .times(1)
        .returning(|_, args| {
            let expanded = PathBuf::from(&args[2]);
            for tool in ["tsh", "tctl"] {
                let macos = expanded
                    .join(format!("{tool}-1.0.pkg"))
                    .join("Payload")
                    .join(format!("{tool}.app"))
                    .join("Contents")
                    .join("MacOS");
                fs::create_dir_all(&macos)?;
                fs::write(macos.join(tool), tool.as_bytes())?;
            }
            Ok(success_output())
        });
    let expected = vec!["tsh.app".to_owned(), "tctl.app".to_owned()];

    let extracted = PkgExtractor::new(runner)
        .extract(&workspace.archive, &workspace.dest, &expected)
        .expect("extraction succeeds");

    assert_eq!(extracted, expected);
    let binary = workspace.dest.join("tsh.app/Contents/MacOS/tsh");
    assert_eq!(fs::read(binary).expect("read bundle binary"), b"tsh");
    let leftovers: Vec<_> = fs::read_dir(&workspace.dest)
        .expect("read dest")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .filter(|name| name.to_string_lossy().starts_with(".pkg-expand-"))
        .collect();
    assert!(leftovers.is_empty(), "scratch dir left behind: {leftovers:?}");
}

#[rstest]
fn pkg_reports_pkgutil_failure(workspace: Workspace) {
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .returning(|_, _| Ok(failure_output("Could not open package")));

    let result = PkgExtractor::new(runner).extract(
        &workspace.archive,
        &workspace.dest,
        &["tsh.app".to_owned()],
    );

    match result {
        Err(ExtractionError::CommandFailed { reason, .. }) => {
            assert_eq!(reason, "Could not open package");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[test]
fn extractor_for_selects_by_format() {
    let temp = tempfile::tempdir().expect("temp dir");
    let archive = temp.path().join("a.zip");
    fs::write(&archive, zip_archive(&[("tsh.exe", "x")])).expect("write archive");

    let extractor = extractor_for(PackageFormat::Zip);
    let extracted = extractor
        .extract(&archive, temp.path(), &["tsh.exe".to_owned()])
        .expect("zip extractor handles zip archives");

    assert_eq!(extracted, vec!["tsh.exe".to_owned()]);
}
