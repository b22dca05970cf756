//! Timer slots keyed by purpose.
//!
//! Each state machine owns one [`Timers`] value and names its timers with a
//! small enum. A kind holds at most one deadline: arming it again replaces
//! the previous deadline, so a stale timer can never fire against newer
//! state. Deadlines are plain instants; drivers learn when to wake through
//! [`Timers::next_deadline`] and fire timers by calling the owning state
//! machine's `tick(now)`.

use std::fmt::Debug;

use crate::env::Timestamp;

/// Set of pending deadlines, at most one per kind.
#[derive(Debug, Clone)]
pub struct Timers<K, I> {
    slots: Vec<(K, I)>,
}

impl<K, I> Default for Timers<K, I> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<K, I> Timers<K, I>
where
    K: Copy + Eq + Debug,
    I: Timestamp,
{
    /// Create an empty set of timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire at `deadline`, replacing any pending deadline.
    pub fn arm(&mut self, kind: K, deadline: I) {
        self.cancel(kind);
        self.slots.push((kind, deadline));
    }

    /// Cancel `kind`. Returns `true` if it was armed.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(k, _)| *k != kind);
        self.slots.len() != before
    }

    /// Whether `kind` is armed.
    #[must_use]
    pub fn is_armed(&self, kind: K) -> bool {
        self.deadline(kind).is_some()
    }

    /// Pending deadline of `kind`, if armed.
    #[must_use]
    pub fn deadline(&self, kind: K) -> Option<I> {
        self.slots.iter().find(|(k, _)| *k == kind).map(|(_, d)| *d)
    }

    /// Earliest pending deadline across all kinds.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.slots.iter().map(|(_, d)| *d).min()
    }

    /// Disarm and return the earliest timer due at `now`.
    ///
    /// Ties fire in the order they were armed. Call repeatedly until `None`,
    /// handling each kind before popping the next: a handler may arm or
    /// cancel other timers.
    pub fn pop_expired(&mut self, now: I) -> Option<K> {
        let index = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .min_by_key(|(index, (_, deadline))| (*deadline, *index))
            .map(|(index, _)| index)?;

        Some(self.slots.remove(index).0)
    }

    /// Whether no timer is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn arming_replaces_previous_deadline() {
        let t0 = Instant::now();
        let mut timers = Timers::new();

        timers.arm(Kind::A, t0 + Duration::from_secs(1));
        timers.arm(Kind::A, t0 + Duration::from_secs(5));

        assert_eq!(timers.deadline(Kind::A), Some(t0 + Duration::from_secs(5)));
        assert_eq!(timers.pop_expired(t0 + Duration::from_secs(2)), None);
        assert_eq!(timers.pop_expired(t0 + Duration::from_secs(5)), Some(Kind::A));
        assert!(timers.is_empty());
    }

    #[test]
    fn expired_timers_fire_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = Timers::new();

        timers.arm(Kind::A, t0 + Duration::from_secs(3));
        timers.arm(Kind::B, t0 + Duration::from_secs(1));

        let now = t0 + Duration::from_secs(10);
        assert_eq!(timers.pop_expired(now), Some(Kind::B));
        assert_eq!(timers.pop_expired(now), Some(Kind::A));
        assert_eq!(timers.pop_expired(now), None);
    }

    #[test]
    fn cancel_reports_whether_armed() {
        let t0 = Instant::now();
        let mut timers = Timers::new();

        assert!(!timers.cancel(Kind::A));
        timers.arm(Kind::A, t0);
        assert!(timers.is_armed(Kind::A));
        assert!(timers.cancel(Kind::A));
        assert!(!timers.is_armed(Kind::A));
    }

    #[test]
    fn next_deadline_is_earliest() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        assert_eq!(timers.next_deadline(), None);

        timers.arm(Kind::A, t0 + Duration::from_secs(3));
        timers.arm(Kind::B, t0 + Duration::from_secs(2));
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_secs(2)));
    }
}
