//! Unit tests for the tools directory lock.

use super::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct LockDir {
    _temp: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn lock_dir() -> LockDir {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    LockDir { _temp: temp, path }
}

#[rstest]
fn acquire_creates_lock_file_that_outlives_the_guard(lock_dir: LockDir) {
    let guard = acquire(&lock_dir.path).expect("acquire lock");
    assert_eq!(guard.path(), lock_path(&lock_dir.path));
    assert!(guard.path().is_file());

    guard.release();

    assert!(lock_path(&lock_dir.path).is_file());
}

#[rstest]
fn try_acquire_reports_contention(lock_dir: LockDir) {
    let _held = acquire(&lock_dir.path).expect("acquire lock");

    let result = try_acquire(&lock_dir.path);

    assert!(
        matches!(result, Err(LockError::Locked { .. })),
        "expected Locked, got {result:?}"
    );
}

#[rstest]
fn lock_is_free_again_after_drop(lock_dir: LockDir) {
    {
        let _held = acquire(&lock_dir.path).expect("acquire lock");
    }

    let guard = try_acquire(&lock_dir.path).expect("lock is free after drop");
    drop(guard);
}

#[rstest]
fn bounded_wait_times_out_while_held(lock_dir: LockDir) {
    let _held = acquire(&lock_dir.path).expect("acquire lock");

    let result = acquire_with_timeout(&lock_dir.path, Some(Duration::from_millis(250)));

    match result {
        Err(LockError::TimedOut { waited, .. }) => {
            assert!(waited >= Duration::from_millis(250));
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[rstest]
fn bounded_wait_succeeds_once_released(lock_dir: LockDir) {
    let held = acquire(&lock_dir.path).expect("acquire lock");
    let dir = lock_dir.path.clone();

    let waiter = thread::spawn(move || acquire_with_timeout(&dir, Some(Duration::from_secs(10))));
    thread::sleep(Duration::from_millis(200));
    held.release();

    let result = waiter.join().expect("waiter thread");
    assert!(result.is_ok(), "expected lock after release, got {result:?}");
}

#[cfg(unix)]
#[rstest]
fn blocking_acquire_waits_for_holder(lock_dir: LockDir) {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let held = acquire(&lock_dir.path).expect("acquire lock");
    let released = Arc::new(AtomicBool::new(false));

    let dir = lock_dir.path.clone();
    let observed = Arc::clone(&released);
    let waiter = thread::spawn(move || {
        let guard = acquire(&dir).expect("acquire after release");
        let saw_release = observed.load(Ordering::SeqCst);
        drop(guard);
        saw_release
    });

    thread::sleep(Duration::from_millis(200));
    released.store(true, Ordering::SeqCst);
    held.release();

    assert!(
        waiter.join().expect("waiter thread"),
        "second holder entered before the first released"
    );
}

#[rstest]
fn acquire_fails_for_missing_directory(lock_dir: LockDir) {
    let missing = lock_dir.path.join("does-not-exist");

    let result = acquire(&missing);

    assert!(matches!(result, Err(LockError::Io { .. })));
}
