//! Double-submission guard
//!
//! A listing is not idempotent, so the HTTP layer holds a permit for the
//! duration of each listing. A second submission for the same seller and
//! token URI is refused while the first is still running.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Held while a listing runs; releases its key on drop
pub struct SubmissionPermit {
    key: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if `key` is already in flight
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<SubmissionPermit> {
        let key = key.into();
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key.clone()) {
            return None;
        }
        Some(SubmissionPermit {
            key,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl Drop for SubmissionPermit {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = SubmissionGuard::new();

        let permit = guard.try_acquire("seller:QmVideo");
        assert!(permit.is_some());
        assert!(guard.try_acquire("seller:QmVideo").is_none());
        assert!(guard.try_acquire("seller:QmOther").is_some());
    }

    #[test]
    fn test_drop_releases() {
        let guard = SubmissionGuard::new();

        {
            let _permit = guard.try_acquire("seller:QmVideo").unwrap();
            assert_eq!(guard.in_flight_count(), 1);
        }

        assert_eq!(guard.in_flight_count(), 0);
        assert!(guard.try_acquire("seller:QmVideo").is_some());
    }
}
