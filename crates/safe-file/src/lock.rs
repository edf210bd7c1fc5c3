//! Exclusively locked file handles with bounded, jittered acquisition.
//!
//! Locks are fs2 advisory locks on open file handles, so mutual exclusion
//! works across threads and processes that cooperate through this crate.
//! Acquisition never blocks indefinitely: it polls a non-blocking lock
//! under a try budget and a hard deadline, sleeping a uniformly random
//! interval between attempts so competing writers do not retry in step.

use std::fs::OpenOptions;
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use rand::Rng;

use crate::budget::RetryBudget;
use crate::error::{ErrorKind, FileError, FileResult};
use crate::path::AbsolutePath;

/// Sleep range between lock attempts.
const MIN_LOCK_WAIT: Duration = Duration::from_millis(50);
const MAX_LOCK_WAIT: Duration = Duration::from_millis(700);

/// Lock timeouts are clamped into this range of whole seconds.
const MIN_TIMEOUT_SECS: u64 = 2;
const MAX_TIMEOUT_SECS: u64 = 16;

/// Default lock timeout when no size-derived value applies.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(MIN_TIMEOUT_SECS);

/// How the underlying file is opened before locking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandleMode {
    /// Create the file if absent, then open read-write.
    #[default]
    Create,
    /// Open an existing file read-write; fail if it does not exist.
    Existing,
}

/// An open file holding an exclusive lock.
///
/// The lock is released and the file closed exactly once, when the guard
/// drops, on every exit path. Because the guard moves by value, a released
/// handle cannot be used again.
#[derive(Debug)]
pub struct LockedHandle {
    file: std::fs::File,
}

impl LockedHandle {
    pub fn file(&self) -> &std::fs::File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut std::fs::File {
        &mut self.file
    }

    /// Unlock and close. Dropping does the same; this name just makes the
    /// release point visible in calling code.
    pub fn release(self) {}
}

impl Drop for LockedHandle {
    fn drop(&mut self) {
        // Closing the descriptor would drop the lock anyway; unlocking first
        // keeps the release observable to waiters immediately.
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Acquire an exclusively locked handle on `path` within a bounded wait.
///
/// `timeout` is clamped to `[2, 16]` seconds and also caps the try count at
/// twice its value. Fails with [`ErrorKind::AcquireHandle`] when the file
/// cannot be opened and [`ErrorKind::LockLimitsExceeded`] when the lock is
/// not obtained within the budget.
pub fn acquire(
    path: &AbsolutePath,
    mode: HandleMode,
    timeout: Duration,
) -> FileResult<LockedHandle> {
    acquire_with(path, mode, timeout, uniform_wait)
}

/// [`acquire`] with an injectable wait source, for deterministic tests.
pub(crate) fn acquire_with<F>(
    path: &AbsolutePath,
    mode: HandleMode,
    timeout: Duration,
    mut next_wait: F,
) -> FileResult<LockedHandle>
where
    F: FnMut(Duration, Duration) -> Duration,
{
    let native = path.to_native();
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    if mode == HandleMode::Create {
        options.create(true);
    }
    let file = options.open(&native).map_err(|err| {
        FileError::from_io(
            ErrorKind::AcquireHandle,
            format!("could not get file handle for {path}"),
            err,
        )
    })?;

    let secs = timeout.as_secs().clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
    let mut budget = RetryBudget::new((2 * secs) as u32, Duration::from_secs(secs));
    loop {
        if file.try_lock_exclusive().is_ok() {
            return Ok(LockedHandle { file });
        }
        let wait = next_wait(MIN_LOCK_WAIT, MAX_LOCK_WAIT);
        // The overshoot check runs before sleeping so the last wait cannot
        // run past the deadline.
        if !budget.charge() || budget.would_overshoot(wait) {
            return Err(FileError::new(
                ErrorKind::LockLimitsExceeded,
                format!("exceeded exclusive lock time or try limit for {path}"),
            ));
        }
        tracing::trace!(
            path = %path,
            tries = budget.tries(),
            wait_ms = wait.as_millis() as u64,
            "exclusive lock contended, backing off"
        );
        thread::sleep(wait);
    }
}

/// Uniformly random duration in `[min, max]`.
pub(crate) fn uniform_wait(min: Duration, max: Duration) -> Duration {
    let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}
