//! Modification times.
//!
//! Every mutable input (data arrays, image data, transfer function curves,
//! volume properties) carries a [`ModTime`] drawn from one process-wide
//! monotonic counter, so stamps from different objects are comparable.

use std::sync::atomic::{AtomicU64, Ordering};

static CLOCK: AtomicU64 = AtomicU64::new(0);

/// A point on the global modification clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModTime(u64);

impl ModTime {
    /// The time before anything was modified or built.
    pub const ZERO: ModTime = ModTime(0);

    /// Advances the global clock and returns the new time.
    pub fn now() -> Self {
        ModTime(CLOCK.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Wraps a raw counter value. Used to inject fixed times in tests.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        ModTime(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns whether this time was ever set.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }
}

/// A modification time owned by a mutable object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeStamp(ModTime);

impl TimeStamp {
    /// Creates a stamp that is already marked modified.
    pub fn new() -> Self {
        TimeStamp(ModTime::now())
    }

    /// Marks the owner as modified now.
    pub fn modified(&mut self) {
        self.0 = ModTime::now();
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn get(&self) -> ModTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let a = ModTime::now();
        let b = ModTime::now();
        assert!(b > a);
        assert!(a.is_set());
        assert!(!ModTime::ZERO.is_set());
    }

    #[test]
    fn test_timestamp_modified_advances() {
        let mut stamp = TimeStamp::new();
        let before = stamp.get();
        stamp.modified();
        assert!(stamp.get() > before);
    }
}
