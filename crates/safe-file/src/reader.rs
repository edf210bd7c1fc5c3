//! Whole-file reads under an exclusive lock.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::budget::{IoBudget, MAX_STALLED_TRIES, RetryBudget};
use crate::error::{ErrorKind, FileError, FileResult};
use crate::lock::{self, HandleMode};
use crate::path::AbsolutePath;

/// Read the entire contents of `path` within a size-derived budget.
///
/// `estimated_size` drives the buffer size and the deadline; a generous
/// estimate only makes the budget roomier, it does not change the result.
/// The read loop tolerates stalls as long as it keeps making progress, but
/// the deadline is hard. The handle is released on every path.
pub fn read_all(path: &AbsolutePath, estimated_size: u64) -> FileResult<Vec<u8>> {
    let native = path.to_native();
    // Metadata is queried fresh on every call; nothing is cached between
    // operations.
    let is_file = fs::metadata(&native).map(|meta| meta.is_file()).unwrap_or(false);
    if !is_file || !can_read(&native) {
        return Err(FileError::new(
            ErrorKind::UnreadableFile,
            format!("was not given accessible file: {path}"),
        ));
    }

    let io_budget = IoBudget::for_size(estimated_size);
    let mut handle = lock::acquire(path, HandleMode::Existing, io_budget.timeout)?;
    handle
        .file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|err| {
            FileError::from_io(
                ErrorKind::UnreadableFile,
                format!("could not rewind {path}"),
                err,
            )
        })?;

    let mut data = Vec::new();
    let mut buf = vec![0u8; io_budget.buffer_size];
    let mut budget = RetryBudget::new(MAX_STALLED_TRIES, io_budget.timeout);
    let mut last_io: Option<std::io::Error> = None;
    loop {
        if !budget.charge() {
            let message = format!("exceeded file reading time or try limit for {path}");
            return Err(match last_io {
                Some(err) => FileError::from_io(ErrorKind::ReadLimitsExceeded, message, err),
                None => FileError::new(ErrorKind::ReadLimitsExceeded, message),
            });
        }
        match handle.file_mut().read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                budget.refund();
                data.extend_from_slice(&buf[..n]);
            }
            // Zero progress; the attempt stays charged against the stall budget.
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => last_io = Some(err),
        }
    }
    Ok(data)
}

fn can_read(native: &Path) -> bool {
    #[cfg(unix)]
    {
        nix::unistd::access(native, nix::unistd::AccessFlags::R_OK).is_ok()
    }
    #[cfg(not(unix))]
    {
        let _ = native;
        true
    }
}
