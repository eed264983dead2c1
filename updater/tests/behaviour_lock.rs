//! Behaviour-driven tests for the tools directory lock.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::time::Duration;
use tempfile::TempDir;
use toolup_updater::lock::{self, DirectoryLock, LockError};

#[derive(Default)]
struct LockWorld {
    temp: RefCell<Option<TempDir>>,
    held: RefCell<Option<DirectoryLock>>,
    attempt: RefCell<Option<Result<DirectoryLock, LockError>>>,
}

impl LockWorld {
    fn tools_dir(&self) -> Utf8PathBuf {
        let temp = self.temp.borrow();
        let dir = temp.as_ref().expect("tools directory prepared");
        Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 temp path")
    }
}

#[fixture]
fn lock_world() -> LockWorld {
    LockWorld::default()
}

#[given("a tools directory")]
fn given_tools_directory(lock_world: &LockWorld) {
    let temp = tempfile::tempdir().expect("temp dir");
    lock_world.temp.replace(Some(temp));
}

#[given("the lock is held")]
fn given_lock_held(lock_world: &LockWorld) {
    let guard = lock::acquire(&lock_world.tools_dir()).expect("acquire lock");
    lock_world.held.replace(Some(guard));
}

#[when("another holder tries to take the lock")]
fn when_try_acquire(lock_world: &LockWorld) {
    let attempt = lock::try_acquire(&lock_world.tools_dir());
    lock_world.attempt.replace(Some(attempt));
}

#[when("the lock is released")]
fn when_lock_released(lock_world: &LockWorld) {
    let guard = lock_world.held.take().expect("lock was held");
    guard.release();
}

#[when("another holder waits {millis} milliseconds for the lock")]
fn when_bounded_wait(lock_world: &LockWorld, millis: u64) {
    let attempt =
        lock::acquire_with_timeout(&lock_world.tools_dir(), Some(Duration::from_millis(millis)));
    lock_world.attempt.replace(Some(attempt));
}

#[then("the attempt reports the lock as busy")]
fn then_busy(lock_world: &LockWorld) {
    let attempt = lock_world.attempt.borrow();
    assert!(
        matches!(attempt.as_ref(), Some(Err(LockError::Locked { .. }))),
        "expected a busy lock, got {attempt:?}"
    );
}

#[then("the attempt succeeds")]
fn then_succeeds(lock_world: &LockWorld) {
    let attempt = lock_world.attempt.borrow();
    assert!(
        matches!(attempt.as_ref(), Some(Ok(_))),
        "expected the lock, got {attempt:?}"
    );
}

#[then("the lock file remains in the tools directory")]
fn then_lock_file_remains(lock_world: &LockWorld) {
    assert!(lock::lock_path(&lock_world.tools_dir()).is_file());
}

#[then("the attempt times out")]
fn then_times_out(lock_world: &LockWorld) {
    let attempt = lock_world.attempt.borrow();
    match attempt.as_ref() {
        Some(Err(LockError::TimedOut { waited, .. })) => {
            assert!(*waited >= Duration::from_millis(200));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/lock.feature", index = 0)]
fn scenario_second_holder_sees_busy(lock_world: LockWorld) {
    let _ = lock_world;
}

#[scenario(path = "tests/features/lock.feature", index = 1)]
fn scenario_lock_free_after_release(lock_world: LockWorld) {
    let _ = lock_world;
}

#[scenario(path = "tests/features/lock.feature", index = 2)]
fn scenario_bounded_wait_times_out(lock_world: LockWorld) {
    let _ = lock_world;
}
