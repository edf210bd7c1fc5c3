//! Atomic whole-file writes and lock-guarded deletion with bounded retries.
//!
//! Writes never touch the target's contents in place. Data goes to a
//! randomly named sibling under its own lock, and the target is replaced in
//! a single rename once the sibling is complete and flushed, so a reader
//! can never observe a half-written file. A lock on the target itself
//! serializes competing writers for the duration.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::budget::{IoBudget, MAX_STALLED_TRIES, RetryBudget};
use crate::error::{ErrorKind, FileError, FileResult};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT, HandleMode};
use crate::path::AbsolutePath;

/// Sleep range between unlink attempts.
const MIN_DELETE_WAIT: Duration = Duration::from_millis(10);
const MAX_DELETE_WAIT: Duration = Duration::from_millis(500);

/// Unlink attempts before giving up.
const MAX_DELETE_TRIES: u32 = 10;

/// Atomically replace the contents of `path` with `data`.
///
/// The previous target is deleted first, competing writers are serialized
/// by a lock on the target path, and the payload is written to a temp
/// sibling that is renamed onto the target only once complete. On failure
/// the target either keeps its old content or does not exist; it is never
/// partially written.
pub fn write_all(path: &AbsolutePath, data: &[u8]) -> FileResult<()> {
    let native = path.to_native();
    let dir = native
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            FileError::new(
                ErrorKind::BadPathOrFile,
                format!("file has no containing directory: {path}"),
            )
        })?;
    if !is_writable_dir(&dir) {
        return Err(FileError::new(
            ErrorKind::BadPathOrFile,
            format!("given non-writable path for file: {path}"),
        ));
    }

    delete_with_retry(path).map_err(|err| {
        FileError::with_cause(
            ErrorKind::WriteFile,
            format!("could not delete file before re-writing: {path}"),
            err,
        )
    })?;

    // This lock carries no data; it only serializes concurrent writers of
    // the same target while the temp sibling is prepared.
    let target_lock = lock::acquire(path, HandleMode::Create, DEFAULT_LOCK_TIMEOUT).map_err(
        |err| {
            FileError::with_cause(
                ErrorKind::WriteFile,
                format!("could not acquire locked file handle before re-writing: {path}"),
                err,
            )
        },
    )?;

    let tmp = path.sibling(&temp_name(path));
    if let Err(err) = write_data(&tmp, data) {
        // write_data cleans up after itself on most paths; this covers an
        // orphan from a failed open or lock on the temp file.
        let _ = fs::remove_file(tmp.to_native());
        return Err(FileError::with_cause(
            ErrorKind::WriteFile,
            format!("failed while writing to tmp file for {path}"),
            err,
        ));
    }

    let renamed = fs::rename(tmp.to_native(), &native);
    target_lock.release();
    renamed.map_err(|err| {
        if let Err(cleanup) = fs::remove_file(tmp.to_native()) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(tmp = %tmp, error = %cleanup, "could not remove orphaned tmp file");
            }
        }
        FileError::from_io(
            ErrorKind::WriteFile,
            format!("could not rename tmp file onto {path}"),
            err,
        )
    })
}

/// Delete `path`, retrying the unlink with randomized waits.
///
/// A path that is not currently a regular file counts as already deleted.
/// Exclusive access is taken on a best-effort basis to drain cooperating
/// lock holders and truncate the contents before the unlink; failing to
/// get the lock does not abort the deletion.
pub fn delete_with_retry(path: &AbsolutePath) -> FileResult<()> {
    delete_with_retry_with(path, lock::uniform_wait)
}

/// [`delete_with_retry`] with an injectable wait source, for deterministic tests.
pub(crate) fn delete_with_retry_with<F>(path: &AbsolutePath, mut next_wait: F) -> FileResult<()>
where
    F: FnMut(Duration, Duration) -> Duration,
{
    let native = path.to_native();
    match fs::metadata(&native) {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(()),
    }

    match lock::acquire(path, HandleMode::Existing, DEFAULT_LOCK_TIMEOUT) {
        Ok(mut handle) => {
            let _ = handle.file_mut().set_len(0);
            let _ = handle.file_mut().seek(SeekFrom::Start(0));
            handle.release();
        }
        Err(err) => {
            tracing::debug!(path = %path, error = %err, "deleting without exclusive lock");
        }
    }

    let mut budget = RetryBudget::tries_only(MAX_DELETE_TRIES);
    let mut last_io: Option<std::io::Error> = None;
    loop {
        if !budget.charge() {
            let message = format!("exceeded delete file try limit for {path}");
            return Err(match last_io {
                Some(err) => FileError::from_io(ErrorKind::DeleteLimitExceeded, message, err),
                None => FileError::new(ErrorKind::DeleteLimitExceeded, message),
            });
        }
        match fs::remove_file(&native) {
            Ok(()) => return Ok(()),
            // Someone else finished the job; the postcondition holds.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                tracing::debug!(
                    path = %path,
                    attempt = budget.tries(),
                    error = %err,
                    "unlink failed, retrying"
                );
                last_io = Some(err);
            }
        }
        thread::sleep(next_wait(MIN_DELETE_WAIT, MAX_DELETE_WAIT));
    }
}

/// Write `data` to the temp sibling under its own lock and budget.
fn write_data(tmp: &AbsolutePath, data: &[u8]) -> FileResult<()> {
    let io_budget = IoBudget::for_size(data.len() as u64);
    let mut handle = lock::acquire(tmp, HandleMode::Create, io_budget.timeout)?;

    let mut written = 0usize;
    let mut budget = RetryBudget::new(MAX_STALLED_TRIES, io_budget.timeout);
    let mut last_io: Option<std::io::Error> = None;
    while written < data.len() {
        if !budget.charge() {
            drop(handle);
            if let Err(cleanup) = delete_with_retry(tmp) {
                tracing::warn!(tmp = %tmp, error = %cleanup, "could not clean up tmp file after stalled write");
            }
            // Write stalls report the read-limits kind; both directions of
            // budget exhaustion share code 6.
            let message = format!("exceeded file writing time or try limit for {tmp}");
            return Err(match last_io {
                Some(err) => FileError::from_io(ErrorKind::ReadLimitsExceeded, message, err),
                None => FileError::new(ErrorKind::ReadLimitsExceeded, message),
            });
        }
        let end = usize::min(written + io_budget.buffer_size, data.len());
        match handle.file_mut().write(&data[written..end]) {
            Ok(0) => {}
            Ok(n) => {
                written += n;
                budget.refund();
            }
            // Zero progress; the attempt stays charged against the stall budget.
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => last_io = Some(err),
        }
    }

    if let Err(err) = handle.file_mut().sync_all() {
        drop(handle);
        let _ = fs::remove_file(tmp.to_native());
        return Err(FileError::from_io(
            ErrorKind::WriteFile,
            format!("could not flush tmp file {tmp}"),
            err,
        ));
    }
    handle.release();
    Ok(())
}

/// Content-independent temp sibling name: a hash of the base name plus
/// fresh random bytes, so concurrent writers of the same target cannot
/// collide.
fn temp_name(path: &AbsolutePath) -> String {
    let base = path.file_name().unwrap_or_default();
    let mut salt = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    hasher.update(salt);
    format!("{:x}.tmp", hasher.finalize())
}

fn is_writable_dir(dir: &Path) -> bool {
    let Ok(meta) = fs::metadata(dir) else {
        return false;
    };
    if !meta.is_dir() {
        return false;
    }
    #[cfg(unix)]
    {
        use nix::unistd::AccessFlags;
        nix::unistd::access(dir, AccessFlags::R_OK | AccessFlags::W_OK).is_ok()
    }
    #[cfg(not(unix))]
    {
        !meta.permissions().readonly()
    }
}
