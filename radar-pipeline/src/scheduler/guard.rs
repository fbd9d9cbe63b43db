//! Single-flight guard
//!
//! At most one cycle runs at a time. Triggers that find the flag taken are
//! dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the running flag until dropped
#[must_use = "the flag is released as soon as the guard is dropped"]
pub(crate) struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    /// Takes the flag, or returns `None` when another holder has it
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
