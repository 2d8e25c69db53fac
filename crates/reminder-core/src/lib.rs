//! Reminder evaluation core for polled calendar events.
//!
//! The engine consumes one batch of event snapshots per poll, decides which
//! notifications are due against the supplied local time, and records every
//! delivered (event, milestone) pair so overlapping batches never fire the
//! same reminder twice. All I/O (fetching events, delivering notifications,
//! driving the poll cadence) lives in the daemon crate.

pub mod engine;
pub mod event;
pub mod milestone;
pub mod state;
pub mod time;

pub use engine::{
    ReminderEngine, ReminderNotification, DEFAULT_THRESHOLDS_MINS, STARTED_GRACE_SECS,
    THRESHOLD_CATCH_WINDOW_SECS, THRESHOLD_EARLY_TOLERANCE_SECS,
};
pub use event::{EventSnapshot, EventStart};
pub use milestone::Milestone;
pub use state::SentReminders;
pub use time::{parse_all_day_date, parse_start_timestamp, EventTimeError};
