//! Task handles and their allocator.

use serde::{Deserialize, Serialize};

/// Cancellation handle for one recurring task or timer.
/// A restarted task always receives a fresh handle, so a stale handle never matches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub u32);

/// Monotonic allocator for TaskHandle.
#[derive(Default, Debug)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> TaskHandle {
        let id = TaskHandle(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
