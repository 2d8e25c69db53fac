use serde::{Deserialize, Serialize};

/// Placeholder summary for events delivered without a title.
pub const DEFAULT_SUMMARY: &str = "No Title";

/// Placeholder link for events delivered without an HTML link.
pub const DEFAULT_LINK: &str = "#";

/// One calendar event as observed in a single poll.
///
/// Snapshots are read-only inputs to the engine; the same occurrence may be
/// re-fetched identically across polls, appear, disappear, or shift time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Opaque identifier, stable across polls for the same occurrence.
    pub id: String,
    pub summary: Option<String>,
    pub html_link: Option<String>,
    pub start: EventStart,
}

/// An event start is exactly one of a timed instant or an all-day date.
///
/// Values are kept as the raw strings handed over by the event source; the
/// engine parses them during evaluation, so a malformed value only skips
/// that event for the current pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStart {
    /// Absolute instant with timezone offset, RFC 3339.
    Timed(String),
    /// Calendar date (`%Y-%m-%d`) with no time component.
    AllDay(String),
}

impl EventSnapshot {
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or(DEFAULT_SUMMARY)
    }

    pub fn link(&self) -> &str {
        self.html_link.as_deref().unwrap_or(DEFAULT_LINK)
    }
}
