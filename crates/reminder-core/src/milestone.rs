use std::fmt;

/// Closed set of per-event notification milestones.
///
/// A milestone, once fired for an event identifier, is never fired again
/// while the identifier stays in the dedup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    /// The event crossed its start time.
    Started,
    /// An all-day event falls on the current local date.
    AllDayToday,
    /// A fixed lead time (minutes) before a timed event starts.
    Threshold(i64),
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Milestone::Started => write!(f, "started"),
            Milestone::AllDayToday => write!(f, "all-day-today"),
            Milestone::Threshold(minutes) => write!(f, "{}m", minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_log_friendly() {
        assert_eq!(Milestone::Started.to_string(), "started");
        assert_eq!(Milestone::AllDayToday.to_string(), "all-day-today");
        assert_eq!(Milestone::Threshold(15).to_string(), "15m");
    }
}
