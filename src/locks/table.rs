//! Global file-lock table (§4.5).
//!
//! A capacity-bounded concurrent map standing in for the source's
//! fixed-size array with a linear scan. `try_acquire` never blocks:
//! a name already present, or a full table with a name not yet present,
//! both answer `Busy`. This is the deadlock-avoidance policy for
//! UPLOAD/DELETE mutators (§5).

use dashmap::DashMap;

/// Outcome of a non-blocking lock acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// The lock was acquired; the caller now owns it and must call
    /// [`LockTable::release`] on every exit path.
    Acquired,
    /// Another task already holds the lock, or the table is at capacity.
    Busy,
}

/// Process-wide registry of files currently being mutated.
#[derive(Debug)]
pub struct LockTable {
    capacity: usize,
    entries: DashMap<String, ()>,
}

impl LockTable {
    /// Creates an empty table bounded to `capacity` concurrent entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: DashMap::new(),
        }
    }

    /// Attempts to acquire the lock on `name`. Never blocks.
    pub fn try_acquire(&self, name: &str) -> AcquireResult {
        if self.entries.contains_key(name) {
            return AcquireResult::Busy;
        }
        // entry() would deadlock-free insert, but we need the explicit
        // capacity check against names not yet present.
        if self.entries.len() >= self.capacity {
            return AcquireResult::Busy;
        }
        match self.entries.insert(name.to_string(), ()) {
            None => AcquireResult::Acquired,
            Some(_) => AcquireResult::Busy,
        }
    }

    /// Releases the lock on `name`. A no-op if `name` is not locked.
    pub fn release(&self, name: &str) {
        self.entries.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_then_blocks_same_name() {
        let table = LockTable::new(10);
        assert_eq!(table.try_acquire("x"), AcquireResult::Acquired);
        assert_eq!(table.try_acquire("x"), AcquireResult::Busy);
    }

    #[test]
    fn release_allows_reacquire() {
        let table = LockTable::new(10);
        table.try_acquire("x");
        table.release("x");
        assert_eq!(table.try_acquire("x"), AcquireResult::Acquired);
    }

    #[test]
    fn distinct_names_do_not_contend() {
        let table = LockTable::new(10);
        assert_eq!(table.try_acquire("x"), AcquireResult::Acquired);
        assert_eq!(table.try_acquire("y"), AcquireResult::Acquired);
    }

    #[test]
    fn capacity_exhaustion_surfaces_as_busy() {
        let table = LockTable::new(1);
        assert_eq!(table.try_acquire("x"), AcquireResult::Acquired);
        assert_eq!(table.try_acquire("y"), AcquireResult::Busy);
    }

    #[test]
    fn release_of_unlocked_name_is_noop() {
        let table = LockTable::new(10);
        table.release("never-locked");
        assert_eq!(table.try_acquire("never-locked"), AcquireResult::Acquired);
    }
}
