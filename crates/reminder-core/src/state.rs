//! Dedup table for delivered reminders.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::milestone::Milestone;

#[derive(Debug, Default)]
struct EventRecord {
    fired: HashSet<Milestone>,
    last_seen: Option<DateTime<Utc>>,
}

/// Per-identifier record of milestones already delivered.
///
/// Flags are never cleared while an entry lives, so at-most-once delivery
/// per (identifier, milestone) holds for the lifetime of the entry. Entries
/// are created lazily and only removed by [`evict_stale`](Self::evict_stale).
#[derive(Debug, Default)]
pub struct SentReminders {
    entries: HashMap<String, EventRecord>,
}

impl SentReminders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that this identifier was observed in the current poll.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) {
        self.entries.entry(id.to_string()).or_default().last_seen = Some(now);
    }

    pub fn has_fired(&self, id: &str, milestone: Milestone) -> bool {
        self.entries
            .get(id)
            .is_some_and(|record| record.fired.contains(&milestone))
    }

    /// Set a milestone flag. Setting an already-set flag is a no-op.
    pub fn mark_fired(&mut self, id: &str, milestone: Milestone) {
        self.entries
            .entry(id.to_string())
            .or_default()
            .fired
            .insert(milestone);
    }

    /// Drop entries not observed for longer than `max_age`, returning how
    /// many were removed. An evicted identifier that reappears is treated
    /// as brand new.
    pub fn evict_stale(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, record| record.last_seen.is_some_and(|seen| now - seen <= max_age));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 3, 30, 0).unwrap()
    }

    #[test]
    fn marking_is_idempotent_and_never_cleared() {
        let mut state = SentReminders::new();
        assert!(!state.has_fired("ev1", Milestone::Started));

        state.mark_fired("ev1", Milestone::Started);
        state.mark_fired("ev1", Milestone::Started);

        assert!(state.has_fired("ev1", Milestone::Started));
        assert!(!state.has_fired("ev1", Milestone::Threshold(15)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn milestones_are_tracked_per_identifier() {
        let mut state = SentReminders::new();
        state.mark_fired("ev1", Milestone::Threshold(15));

        assert!(!state.has_fired("ev2", Milestone::Threshold(15)));
        assert!(state.has_fired("ev1", Milestone::Threshold(15)));
    }

    #[test]
    fn eviction_drops_entries_past_max_age() {
        let mut state = SentReminders::new();
        state.touch("old", t0());
        state.mark_fired("old", Milestone::Started);
        state.touch("fresh", t0() + Duration::hours(23));

        let evicted = state.evict_stale(t0() + Duration::hours(25), Duration::hours(24));

        assert_eq!(evicted, 1);
        assert!(!state.has_fired("old", Milestone::Started));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn touch_refreshes_last_seen() {
        let mut state = SentReminders::new();
        state.touch("ev1", t0());
        state.touch("ev1", t0() + Duration::hours(10));

        assert_eq!(
            state.evict_stale(t0() + Duration::hours(12), Duration::hours(3)),
            0
        );
        assert_eq!(state.len(), 1);
    }
}
