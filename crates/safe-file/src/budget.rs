//! Size-derived I/O budgets and shared bounded-retry accounting.
//!
//! Every bounded loop in this crate (lock acquisition, read, write, delete)
//! spends against a [`RetryBudget`]: a try counter plus an optional hard
//! wall-clock deadline. Read and write loops additionally derive their
//! buffer size and deadline from an estimated payload size via [`IoBudget`].

use std::time::{Duration, Instant};

/// Default size estimate for reads when the caller has no better guess (16 MiB).
pub const DEFAULT_ESTIMATED_SIZE: u64 = 16 * 1024 * 1024;

/// Most consecutive non-progressing attempts an I/O loop tolerates.
pub const MAX_STALLED_TRIES: u32 = 10;

/// Assumed minimum throughput when deriving deadlines: 16 MiB per second.
const THROUGHPUT_SHIFT: u32 = 24;

/// Buffer size and deadline for one read or write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoBudget {
    pub buffer_size: usize,
    pub timeout: Duration,
}

impl IoBudget {
    /// Derive a budget from an estimated size in bytes.
    ///
    /// The buffer grows with `log2` of the size: 4 KiB for tiny files up to
    /// a 100 KiB-class bucket for a 16 MiB estimate. The deadline assumes
    /// 16 MiB/s throughput with a 2 second floor.
    pub fn for_size(estimated_size: u64) -> Self {
        let bucket = u64::from(estimated_size.max(1).ilog2()) + 1;
        let buffer_size = (bucket << 12) as usize;
        let timeout = Duration::from_secs((estimated_size >> THROUGHPUT_SHIFT).max(2));
        Self {
            buffer_size,
            timeout,
        }
    }
}

/// A try counter with an optional hard deadline.
///
/// Configuration is fixed at construction; only the spent-try count moves.
#[derive(Debug)]
pub struct RetryBudget {
    tries: u32,
    max_tries: u32,
    deadline: Option<Instant>,
}

impl RetryBudget {
    pub fn new(max_tries: u32, timeout: Duration) -> Self {
        Self {
            tries: 0,
            max_tries,
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn tries_only(max_tries: u32) -> Self {
        Self {
            tries: 0,
            max_tries,
            deadline: None,
        }
    }

    /// Record one attempt. Returns `false` once the try count or the
    /// deadline is spent.
    pub fn charge(&mut self) -> bool {
        self.tries += 1;
        if self.tries > self.max_tries {
            return false;
        }
        match self.deadline {
            Some(deadline) => Instant::now() <= deadline,
            None => true,
        }
    }

    /// Credit forward progress back to the try count, never below zero.
    pub fn refund(&mut self) {
        self.tries = self.tries.saturating_sub(1);
    }

    /// Whether sleeping for `wait` would run past the deadline.
    pub fn would_overshoot(&self, wait: Duration) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() + wait > deadline,
            None => false,
        }
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }
}
