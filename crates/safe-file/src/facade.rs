//! Public entry point combining validation, locking, read, write, and delete.

use crate::budget::DEFAULT_ESTIMATED_SIZE;
use crate::error::{ErrorKind, FileError, FileResult};
use crate::path::{AbsolutePath, NormalizeFlags, normalize};
use crate::{reader, writer};

/// Safe whole-file operations with per-instance error state.
///
/// Failures are always recorded in the last-error slot. In the default
/// quiet mode they come back as `Ok(None)` / `Ok(false)` sentinels and the
/// caller inspects [`SafeFile::last_error`]; with
/// [`SafeFile::set_exception_mode`] enabled the same recorded error is
/// returned as `Err` instead.
///
/// The slot is overwritten at the start of every public operation, so it
/// only ever describes the most recent call. Operations take `&mut self`;
/// for concurrent use, give each thread its own instance and rely on the
/// returned `FileResult` values.
#[derive(Debug, Default)]
pub struct SafeFile {
    exceptions: bool,
    last_error: Option<FileError>,
}

impl SafeFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch between quiet sentinels (default) and `Err` returns.
    pub fn set_exception_mode(&mut self, enabled: bool) {
        self.exceptions = enabled;
    }

    pub fn exception_mode(&self) -> bool {
        self.exceptions
    }

    /// Whether the most recent operation recorded a failure.
    pub fn has_error(&self) -> bool {
        match &self.last_error {
            Some(err) => err.kind() != ErrorKind::NoError || !err.message().is_empty(),
            None => false,
        }
    }

    /// The most recent error, or the `NoError` sentinel when none is set.
    pub fn last_error(&self) -> FileError {
        self.last_error.clone().unwrap_or_else(FileError::none)
    }

    /// Read the entire file at `path` with the default 16 MiB size estimate.
    pub fn read(&mut self, path: &str) -> FileResult<Option<Vec<u8>>> {
        self.read_sized(path, DEFAULT_ESTIMATED_SIZE)
    }

    /// Read the entire file at `path`, deriving buffers and deadlines from
    /// `estimated_size`.
    pub fn read_sized(
        &mut self,
        path: &str,
        estimated_size: u64,
    ) -> FileResult<Option<Vec<u8>>> {
        self.last_error = None;
        let outcome =
            self.normalize(path).and_then(|p| reader::read_all(&p, estimated_size));
        match outcome {
            Ok(data) => Ok(Some(data)),
            Err(err) => self.fail(err).map(|()| None),
        }
    }

    /// Atomically replace the contents of `path` with `data`.
    pub fn write(&mut self, path: &str, data: &[u8]) -> FileResult<bool> {
        self.last_error = None;
        let outcome = self.normalize(path).and_then(|p| writer::write_all(&p, data));
        match outcome {
            Ok(()) => Ok(true),
            Err(err) => self.fail(err).map(|()| false),
        }
    }

    /// Delete the file at `path`. Deleting a path that does not exist
    /// succeeds.
    pub fn delete(&mut self, path: &str) -> FileResult<bool> {
        self.last_error = None;
        let outcome = self
            .normalize(path)
            .and_then(|p| writer::delete_with_retry(&p));
        match outcome {
            Ok(()) => Ok(true),
            Err(err) => self.fail(err).map(|()| false),
        }
    }

    fn normalize(&self, path: &str) -> FileResult<AbsolutePath> {
        normalize(path, NormalizeFlags::default()).map_err(|err| {
            FileError::with_cause(
                ErrorKind::BadPathOrFile,
                "could not normalize path or file name",
                FileError::new(ErrorKind::BadPathOrFile, err.to_string()),
            )
        })
    }

    fn fail(&mut self, error: FileError) -> FileResult<()> {
        self.last_error = Some(error.clone());
        if self.exceptions { Err(error) } else { Ok(()) }
    }
}
