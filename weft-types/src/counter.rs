//! Monotonic counters owned by the runtime context.
//!
//! Both counters are plain values rather than globals. The runtime is single
//! threaded and takes `&mut self` to issue ids; a runtime shared across
//! threads would need to wrap these in an atomic or give each worker its own
//! partition.

use crate::ids::{Generation, Uid};

/// Hands out instance uids in increasing order, starting at zero.
#[derive(Debug, Clone, Default)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    /// Creates an allocator whose first uid is zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Issues the next uid.
    pub fn next_uid(&mut self) -> Uid {
        let uid = Uid::new(self.next);
        self.next += 1;
        uid
    }

    /// Returns the uid the next call to [`next_uid`](Self::next_uid) will issue.
    #[must_use]
    pub const fn peek(&self) -> Uid {
        Uid::new(self.next)
    }

    /// Returns how many uids have been issued.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next
    }
}

/// Hands out option generations. Generation zero is never issued, so a
/// zeroed cache key can never match a live generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    last: u64,
}

impl GenerationCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Issues a fresh generation, strictly greater than every earlier one.
    pub fn bump(&mut self) -> Generation {
        self.last += 1;
        Generation::new(self.last)
    }

    /// Returns the most recently issued generation, if any.
    #[must_use]
    pub const fn current(&self) -> Option<Generation> {
        if self.last == 0 {
            None
        } else {
            Some(Generation::new(self.last))
        }
    }
}
