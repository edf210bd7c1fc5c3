//! Crash-safe, concurrency-safe whole-file I/O.
//!
//! Reads and writes entire files on a shared filesystem without partial
//! reads, partial writes, or concurrent-writer corruption. Safety comes
//! from OS-level advisory locks, size-derived time and try budgets, and
//! atomic replace-on-write; no database or external lock service is
//! involved.
//!
//! [`SafeFile`] is the intended entry point; the `lock`, `reader`, and
//! `writer` modules expose the underlying building blocks for callers that
//! already hold an [`AbsolutePath`].

pub mod budget;
pub mod error;
pub mod facade;
pub mod lock;
pub mod path;
pub mod reader;
pub mod writer;

pub use budget::{DEFAULT_ESTIMATED_SIZE, IoBudget, MAX_STALLED_TRIES, RetryBudget};
pub use error::{ErrorKind, FileError, FileResult};
pub use facade::SafeFile;
pub use lock::{DEFAULT_LOCK_TIMEOUT, HandleMode, LockedHandle};
pub use path::{AbsolutePath, NormalizeError, NormalizeFlags, normalize};
