//! The reminder decision core.
//!
//! One `evaluate` call consumes a batch of polled event snapshots together
//! with the current local time and returns every notification due this
//! pass. The dedup table is updated as decisions are made, so repeated
//! calls with overlapping batches never re-request the same milestone.
//!
//! Because evaluation is periodic rather than continuous, a threshold
//! crossing cannot be tested for exact equality; each threshold carries a
//! tolerance window sized so that one poll at the default cadence catches
//! the crossing exactly once. A poll delayed past the window misses the
//! crossing for good, which is accepted degradation rather than an error.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::event::{EventSnapshot, EventStart};
use crate::milestone::Milestone;
use crate::state::SentReminders;
use crate::time::{parse_all_day_date, parse_start_timestamp};

/// Default lead times (minutes) to remind at.
pub const DEFAULT_THRESHOLDS_MINS: [i64; 3] = [15, 5, 1];

/// An event that began no more than this many seconds ago still gets its
/// "started" notification.
pub const STARTED_GRACE_SECS: i64 = 5 * 60;

/// A threshold crossing becomes catchable this many seconds before the
/// exact lead time.
pub const THRESHOLD_EARLY_TOLERANCE_SECS: i64 = 10;

/// A threshold crossing stays catchable this many seconds past the exact
/// lead time. The poll interval must not exceed this, or crossings can
/// fall between two polls.
pub const THRESHOLD_CATCH_WINDOW_SECS: i64 = 60;

/// A notification the engine decided is due this pass. Delivery is the
/// caller's concern; delivery failures do not affect engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub event_id: String,
    pub milestone: Milestone,
    pub title: String,
    pub message: String,
}

/// Per-poll reminder evaluation over an in-memory dedup table.
pub struct ReminderEngine {
    /// Minutes, kept sorted descending so the largest satisfied threshold
    /// wins a pass.
    thresholds: Vec<i64>,
    state: SentReminders,
    retention: Option<Duration>,
}

impl ReminderEngine {
    pub fn new(thresholds_mins: &[i64]) -> Self {
        let mut thresholds = thresholds_mins.to_vec();
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();
        Self {
            thresholds,
            state: SentReminders::new(),
            retention: None,
        }
    }

    /// Bound dedup-table growth: entries not observed for `max_age` are
    /// dropped on each [`evict_stale`](Self::evict_stale) call.
    pub fn with_retention(mut self, max_age: Duration) -> Self {
        self.retention = Some(max_age);
        self
    }

    /// Number of event identifiers currently tracked in the dedup table.
    pub fn tracked_events(&self) -> usize {
        self.state.len()
    }

    /// Drop dedup entries older than the configured retention. A no-op
    /// when no retention is set.
    pub fn evict_stale(&mut self, now: DateTime<Utc>) -> usize {
        match self.retention {
            Some(max_age) => self.state.evict_stale(now, max_age),
            None => 0,
        }
    }

    /// Evaluate one batch of events against `now`, returning the
    /// notifications due and marking them fired.
    ///
    /// Events with unparseable start values are logged and skipped for
    /// this pass only; no milestone is marked, so they stay eligible on
    /// the next poll.
    pub fn evaluate(
        &mut self,
        events: &[EventSnapshot],
        now: DateTime<Tz>,
    ) -> Vec<ReminderNotification> {
        let mut due = Vec::new();

        for event in events {
            self.state.touch(&event.id, now.with_timezone(&Utc));

            let notification = match &event.start {
                EventStart::Timed(raw) => match parse_start_timestamp(raw) {
                    Ok(start) => {
                        let start_local = start.with_timezone(&now.timezone());
                        self.evaluate_timed(event, start_local, now)
                    }
                    Err(e) => {
                        tracing::warn!("Skipping event '{}': {}", event.summary(), e);
                        None
                    }
                },
                EventStart::AllDay(raw) => match parse_all_day_date(raw) {
                    Ok(date) => self.evaluate_all_day(event, date, now),
                    Err(e) => {
                        tracing::warn!("Skipping event '{}': {}", event.summary(), e);
                        None
                    }
                },
            };

            due.extend(notification);
        }

        due
    }

    /// At most one notification per timed event per pass: "started" inside
    /// its grace window, otherwise the largest unfired threshold whose
    /// crossing falls inside the catch window.
    fn evaluate_timed(
        &mut self,
        event: &EventSnapshot,
        start_local: DateTime<Tz>,
        now: DateTime<Tz>,
    ) -> Option<ReminderNotification> {
        let time_to_event = start_local - now;

        if time_to_event <= Duration::zero() {
            // An event already starting is not also "upcoming"; past the
            // start, no threshold may fire for this event anymore.
            let milestone = Milestone::Started;
            if time_to_event > Duration::seconds(-STARTED_GRACE_SECS)
                && !self.state.has_fired(&event.id, milestone)
            {
                self.state.mark_fired(&event.id, milestone);
                return Some(started_notification(event, milestone));
            }
            return None;
        }

        for &minutes in &self.thresholds {
            let milestone = Milestone::Threshold(minutes);
            if self.state.has_fired(&event.id, milestone) {
                continue;
            }

            let delta = time_to_event - Duration::minutes(minutes);
            if delta >= Duration::seconds(-THRESHOLD_EARLY_TOLERANCE_SECS)
                && delta < Duration::seconds(THRESHOLD_CATCH_WINDOW_SECS)
            {
                self.state.mark_fired(&event.id, milestone);
                return Some(upcoming_notification(
                    event,
                    milestone,
                    time_to_event,
                    start_local,
                ));
            }
        }

        None
    }

    fn evaluate_all_day(
        &mut self,
        event: &EventSnapshot,
        date: NaiveDate,
        now: DateTime<Tz>,
    ) -> Option<ReminderNotification> {
        let milestone = Milestone::AllDayToday;
        if date == now.date_naive() && !self.state.has_fired(&event.id, milestone) {
            self.state.mark_fired(&event.id, milestone);
            return Some(all_day_notification(event, milestone));
        }
        None
    }
}

impl Default for ReminderEngine {
    fn default() -> Self {
        Self::new(&DEFAULT_THRESHOLDS_MINS)
    }
}

fn started_notification(event: &EventSnapshot, milestone: Milestone) -> ReminderNotification {
    ReminderNotification {
        event_id: event.id.clone(),
        milestone,
        title: format!("Event Started: {}", event.summary()),
        message: format!("It's happening now! Link: {}", event.link()),
    }
}

fn upcoming_notification(
    event: &EventSnapshot,
    milestone: Milestone,
    time_to_event: Duration,
    start_local: DateTime<Tz>,
) -> ReminderNotification {
    // Whole minutes to go at decision time, not the nominal threshold.
    let minutes_left = time_to_event.num_seconds() / 60;
    let minutes_text = if minutes_left == 0 {
        "less than a minute".to_string()
    } else {
        format!("{} minutes", minutes_left)
    };

    ReminderNotification {
        event_id: event.id.clone(),
        milestone,
        title: format!("Upcoming Event: {}", event.summary()),
        message: format!(
            "Starts in approx. {} at {} ({}).\nLink: {}",
            minutes_text,
            start_local.format("%I:%M %p"),
            start_local.format("%Z"),
            event.link()
        ),
    }
}

fn all_day_notification(event: &EventSnapshot, milestone: Milestone) -> ReminderNotification {
    ReminderNotification {
        event_id: event.id.clone(),
        milestone,
        title: format!("All-Day Event Today: {}", event.summary()),
        message: format!(
            "This all-day event is happening today! Details: {}",
            event.link()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;

    fn base_now() -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap()
    }

    fn timed(id: &str, start: DateTime<Tz>) -> EventSnapshot {
        EventSnapshot {
            id: id.to_string(),
            summary: Some("Standup".to_string()),
            html_link: Some("https://calendar.example/ev1".to_string()),
            start: EventStart::Timed(start.to_rfc3339()),
        }
    }

    fn all_day(id: &str, date: &str) -> EventSnapshot {
        EventSnapshot {
            id: id.to_string(),
            summary: Some("Conference".to_string()),
            html_link: None,
            start: EventStart::AllDay(date.to_string()),
        }
    }

    #[test]
    fn thresholds_fire_exactly_once_each_across_polls() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now + Duration::minutes(15));

        let first = engine.evaluate(&[event.clone()], now);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].milestone, Milestone::Threshold(15));
        assert_eq!(first[0].title, "Upcoming Event: Standup");

        // Identical re-poll with an unchanged clock stays silent.
        assert!(engine.evaluate(&[event.clone()], now).is_empty());

        // One minute later the 15m window is behind us and 5m is far off.
        assert!(engine
            .evaluate(&[event.clone()], now + Duration::minutes(1))
            .is_empty());

        let at_five = engine.evaluate(&[event.clone()], now + Duration::minutes(10));
        assert_eq!(at_five.len(), 1);
        assert_eq!(at_five[0].milestone, Milestone::Threshold(5));

        let at_one = engine.evaluate(&[event], now + Duration::minutes(14));
        assert_eq!(at_one.len(), 1);
        assert_eq!(at_one[0].milestone, Milestone::Threshold(1));
    }

    #[test]
    fn largest_threshold_wins_when_windows_overlap() {
        // Thresholds deliberately close enough for both windows to match,
        // and passed unsorted to exercise constructor ordering.
        let mut engine = ReminderEngine::new(&[4, 5]);
        let now = base_now();
        // 4m55s out: delta is -5s against 5m and 55s against 4m.
        let event = timed("ev1", now + Duration::seconds(4 * 60 + 55));

        let first = engine.evaluate(&[event.clone()], now);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].milestone, Milestone::Threshold(5));

        // The smaller threshold stays eligible for a later pass.
        let second = engine.evaluate(&[event], now);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].milestone, Milestone::Threshold(4));
    }

    #[test]
    fn started_fires_once_inside_grace_window() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now - Duration::seconds(30));

        let first = engine.evaluate(&[event.clone()], now);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].milestone, Milestone::Started);
        assert_eq!(first[0].title, "Event Started: Standup");
        assert_eq!(
            first[0].message,
            "It's happening now! Link: https://calendar.example/ev1"
        );

        assert!(engine.evaluate(&[event.clone()], now).is_empty());
        assert!(engine
            .evaluate(&[event], now + Duration::minutes(2))
            .is_empty());
    }

    #[test]
    fn started_suppresses_thresholds_for_good() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now + Duration::seconds(30));

        // 30s out: past every threshold window, before the start.
        assert!(engine.evaluate(&[event.clone()], now).is_empty());

        let started = engine.evaluate(&[event.clone()], now + Duration::seconds(31));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].milestone, Milestone::Started);

        // The never-caught 1m threshold must not surface afterwards.
        assert!(engine
            .evaluate(&[event], now + Duration::minutes(3))
            .is_empty());
    }

    #[test]
    fn event_past_grace_window_is_ignored() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now - Duration::minutes(6));

        assert!(engine.evaluate(&[event], now).is_empty());
        assert!(!engine.state.has_fired("ev1", Milestone::Started));
    }

    #[test]
    fn all_day_event_fires_exactly_once_today() {
        let mut engine = ReminderEngine::default();
        let now = base_now(); // 2024-05-14 local
        let today = all_day("ev1", "2024-05-14");
        let tomorrow = all_day("ev2", "2024-05-15");

        let first = engine.evaluate(&[today.clone(), tomorrow.clone()], now);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].event_id, "ev1");
        assert_eq!(first[0].milestone, Milestone::AllDayToday);
        assert_eq!(first[0].title, "All-Day Event Today: Conference");

        // Polling for the rest of the day stays silent.
        for minutes in [1, 60, 600] {
            assert!(engine
                .evaluate(
                    &[today.clone(), tomorrow.clone()],
                    now + Duration::minutes(minutes)
                )
                .is_empty());
        }
    }

    #[test]
    fn missed_threshold_windows_are_skipped_not_recovered() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now + Duration::minutes(3));

        // First seen three minutes out: no window is open.
        assert!(engine.evaluate(&[event.clone()], now).is_empty());

        // A delayed poll lands past the 1m catch window (45s to go).
        assert!(engine
            .evaluate(&[event.clone()], now + Duration::seconds(135))
            .is_empty());

        // The start itself is still announced.
        let started = engine.evaluate(&[event], now + Duration::minutes(3));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].milestone, Milestone::Started);
        assert!(!engine.state.has_fired("ev1", Milestone::Threshold(1)));
    }

    #[test]
    fn malformed_start_is_skipped_without_marking_state() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let mut event = timed("ev1", now);
        event.start = EventStart::Timed("not-a-date".to_string());

        assert!(engine.evaluate(&[event.clone()], now).is_empty());
        assert!(!engine.state.has_fired("ev1", Milestone::Started));

        // A corrected snapshot on a later poll is still eligible.
        event.start = EventStart::Timed((now + Duration::minutes(15)).to_rfc3339());
        let fixed = engine.evaluate(&[event], now);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].milestone, Milestone::Threshold(15));
    }

    #[test]
    fn malformed_all_day_date_is_skipped() {
        let mut engine = ReminderEngine::default();
        let event = all_day("ev1", "May 14th");

        assert!(engine.evaluate(&[event], base_now()).is_empty());
        assert!(!engine.state.has_fired("ev1", Milestone::AllDayToday));
    }

    #[test]
    fn upcoming_message_floors_minutes_and_renders_local_time() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = timed("ev1", now + Duration::seconds(15 * 60 + 30));

        let due = engine.evaluate(&[event], now);
        assert_eq!(due.len(), 1);
        assert!(due[0].message.contains("15 minutes"));
        assert!(due[0].message.contains("09:15 AM"));
        assert!(due[0].message.contains("(IST)"));
        assert!(due[0].message.contains("Link: https://calendar.example/ev1"));
    }

    #[test]
    fn sub_minute_lead_renders_less_than_a_minute() {
        let mut engine = ReminderEngine::new(&[1]);
        let now = base_now();
        let event = timed("ev1", now + Duration::seconds(55));

        let due = engine.evaluate(&[event], now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].milestone, Milestone::Threshold(1));
        assert!(due[0].message.contains("less than a minute"));
    }

    #[test]
    fn missing_summary_and_link_fall_back_to_placeholders() {
        let mut engine = ReminderEngine::default();
        let now = base_now();
        let event = EventSnapshot {
            id: "ev1".to_string(),
            summary: None,
            html_link: None,
            start: EventStart::Timed((now + Duration::minutes(15)).to_rfc3339()),
        };

        let due = engine.evaluate(&[event], now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "Upcoming Event: No Title");
        assert!(due[0].message.ends_with("Link: #"));
    }

    #[test]
    fn retention_evicts_only_stale_entries() {
        let mut engine = ReminderEngine::default().with_retention(Duration::hours(24));
        let now = base_now();
        let event = timed("ev1", now + Duration::minutes(15));

        engine.evaluate(&[event], now);
        assert_eq!(engine.tracked_events(), 1);

        let now_utc = now.with_timezone(&Utc);
        assert_eq!(engine.evict_stale(now_utc + Duration::hours(1)), 0);
        assert_eq!(engine.tracked_events(), 1);

        assert_eq!(engine.evict_stale(now_utc + Duration::hours(25)), 1);
        assert_eq!(engine.tracked_events(), 0);
    }

    #[test]
    fn without_retention_eviction_is_a_noop() {
        let mut engine = ReminderEngine::default();
        let now = base_now();

        engine.evaluate(&[timed("ev1", now + Duration::minutes(15))], now);
        assert_eq!(
            engine.evict_stale(now.with_timezone(&Utc) + Duration::days(30)),
            0
        );
        assert_eq!(engine.tracked_events(), 1);
    }
}
