//! Typed, chainable error values for safe file operations.

/// Result type for safe file operations.
pub type FileResult<T> = std::result::Result<T, FileError>;

/// The failure classes a safe file operation can report.
///
/// The numeric codes are part of the public contract and are stable; note
/// that `4` follows `2` because two historical codes were retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Sentinel for "no failure recorded".
    NoError,
    /// The file could not be opened at all.
    AcquireHandle,
    /// Path normalization failed, or the containing directory is unusable.
    BadPathOrFile,
    /// Unlink retries were exhausted.
    DeleteLimitExceeded,
    /// The exclusive lock was not obtained within its time or try budget.
    LockLimitsExceeded,
    /// A read or write loop ran out of its stall or deadline budget.
    ReadLimitsExceeded,
    /// The target is not an accessible regular file.
    UnreadableFile,
    /// A write failed in one of its preparatory or final steps.
    WriteFile,
}

impl ErrorKind {
    /// Stable numeric code for this kind.
    pub const fn code(self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::AcquireHandle => 1,
            Self::BadPathOrFile => 2,
            Self::DeleteLimitExceeded => 4,
            Self::LockLimitsExceeded => 5,
            Self::ReadLimitsExceeded => 6,
            Self::UnreadableFile => 7,
            Self::WriteFile => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::AcquireHandle => "acquire handle error",
            Self::BadPathOrFile => "bad path or file error",
            Self::DeleteLimitExceeded => "delete limit exceeded error",
            Self::LockLimitsExceeded => "lock limits exceeded error",
            Self::ReadLimitsExceeded => "read limits exceeded error",
            Self::UnreadableFile => "unreadable file error",
            Self::WriteFile => "write file error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable error value with a kind, a message, and an optional chain
/// of prior causes.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} ({kind})")]
pub struct FileError {
    message: String,
    kind: ErrorKind,
    #[source]
    cause: Option<Box<FileError>>,
}

impl FileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: None,
        }
    }

    pub fn with_cause(kind: ErrorKind, message: impl Into<String>, cause: FileError) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: Some(Box::new(cause)),
        }
    }

    /// Wrap a lower-level I/O failure as the cause of a new error.
    pub(crate) fn from_io(
        kind: ErrorKind,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::with_cause(kind, message, Self::new(kind, source.to_string()))
    }

    /// The `NoError` sentinel with an empty message.
    pub fn none() -> Self {
        Self::new(ErrorKind::NoError, "")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&FileError> {
        self.cause.as_deref()
    }

    /// Render the full cause chain, oldest failure first, newest last.
    pub fn report(&self) -> String {
        let mut chain: Vec<&FileError> = Vec::new();
        let mut current = Some(self);
        while let Some(err) = current {
            chain.push(err);
            current = err.cause.as_deref();
        }
        chain
            .iter()
            .rev()
            .map(|err| format!("{} (code {}): {}", err.kind, err.code(), err.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::NoError.code(), 0);
        assert_eq!(ErrorKind::AcquireHandle.code(), 1);
        assert_eq!(ErrorKind::BadPathOrFile.code(), 2);
        assert_eq!(ErrorKind::DeleteLimitExceeded.code(), 4);
        assert_eq!(ErrorKind::LockLimitsExceeded.code(), 5);
        assert_eq!(ErrorKind::ReadLimitsExceeded.code(), 6);
        assert_eq!(ErrorKind::UnreadableFile.code(), 7);
        assert_eq!(ErrorKind::WriteFile.code(), 8);
    }

    #[test]
    fn none_sentinel_is_empty() {
        let err = FileError::none();
        assert_eq!(err.kind(), ErrorKind::NoError);
        assert_eq!(err.code(), 0);
        assert_eq!(err.message(), "");
        assert!(err.cause().is_none());
    }

    #[test]
    fn report_renders_oldest_cause_first() {
        let root = FileError::new(ErrorKind::AcquireHandle, "open failed");
        let mid = FileError::with_cause(ErrorKind::LockLimitsExceeded, "lock failed", root);
        let top = FileError::with_cause(ErrorKind::WriteFile, "write failed", mid);

        let report = top.report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            vec![
                "acquire handle error (code 1): open failed",
                "lock limits exceeded error (code 5): lock failed",
                "write file error (code 8): write failed",
            ]
        );
    }

    #[test]
    fn source_exposes_the_chain() {
        use std::error::Error;

        let root = FileError::new(ErrorKind::AcquireHandle, "open failed");
        let top = FileError::with_cause(ErrorKind::WriteFile, "write failed", root);

        let source = top.source().expect("cause should be exposed");
        assert_eq!(source.to_string(), "open failed (acquire handle error)");
        assert!(source.source().is_none());
    }

    #[test]
    fn display_shows_message_and_kind() {
        let err = FileError::new(ErrorKind::UnreadableFile, "was not given accessible file");
        assert_eq!(
            err.to_string(),
            "was not given accessible file (unreadable file error)"
        );
    }
}
