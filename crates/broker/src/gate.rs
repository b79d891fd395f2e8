//! Admission gate: the fixed-size concurrency budget.
//!
//! The in-flight counter is a single atomic. `try_admit` and `release` are
//! each one compare-and-swap, so the gate can be shared across runtime
//! worker threads without a lock and never suspends.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks how many jobs currently hold a slot.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    in_flight: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots. A zero capacity is raised to 1
    /// so the broker can always make progress.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Claim a slot if one is free.
    ///
    /// Returns `true` and increments the counter when `in_flight < capacity`;
    /// otherwise returns `false` without side effects.
    pub fn try_admit(&self) -> bool {
        let capacity = self.capacity;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .is_ok()
    }

    /// Give a slot back. Must be called exactly once per successful
    /// [`AdmissionGate::try_admit`].
    pub fn release(&self) {
        let released = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if released.is_err() {
            tracing::error!("Admission gate released with no slot in flight");
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn admits_up_to_capacity() {
        let gate = AdmissionGate::new(3);
        assert!(gate.try_admit());
        assert!(gate.try_admit());
        assert!(gate.try_admit());
        assert!(!gate.try_admit());
        assert_eq!(gate.in_flight(), 3);
    }

    #[test]
    fn refused_admission_has_no_side_effect() {
        let gate = AdmissionGate::new(1);
        assert!(gate.try_admit());
        for _ in 0..10 {
            assert!(!gate.try_admit());
        }
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn release_frees_a_slot() {
        let gate = AdmissionGate::new(1);
        assert!(gate.try_admit());
        gate.release();
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.try_admit());
    }

    #[test]
    fn release_without_admit_does_not_underflow() {
        let gate = AdmissionGate::new(2);
        gate.release();
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.capacity(), 2);
        assert!(gate.try_admit());
        assert!(gate.try_admit());
        assert!(!gate.try_admit());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
        assert!(gate.try_admit());
    }

    #[test]
    fn concurrent_admission_never_exceeds_capacity() {
        let gate = Arc::new(AdmissionGate::new(4));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || {
                    (0..1000).filter(|_| gate.try_admit()).count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(admitted, 4);
        assert_eq!(gate.in_flight(), 4);
    }
}
