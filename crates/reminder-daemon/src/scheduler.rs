use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::time::Duration as StdDuration;
use tokio::time;

use reminder_core::ReminderEngine;

use crate::calendar::CalendarClient;
use crate::config::Config;
use crate::notifier::DesktopNotifier;

/// Drives the evaluate-and-notify cycle on a fixed cadence.
///
/// The engine and its dedup table are owned here and touched only from
/// `run`'s single task, so cycles never overlap and no locking is needed.
pub struct ReminderScheduler {
    client: CalendarClient,
    notifier: DesktopNotifier,
    engine: ReminderEngine,
    config: Config,
    tz: Tz,
}

impl ReminderScheduler {
    pub fn new(client: CalendarClient, notifier: DesktopNotifier, config: Config, tz: Tz) -> Self {
        let mut engine = ReminderEngine::new(&config.reminder_thresholds_mins);
        if config.state_retention_hours > 0 {
            engine = engine.with_retention(Duration::hours(config.state_retention_hours as i64));
        }

        Self {
            client,
            notifier,
            engine,
            config,
            tz,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let interval = StdDuration::from_secs(self.config.poll_interval_secs);
        let mut ticker = time::interval(interval);

        tracing::info!("Reminder scheduler started (interval: {:?})", interval);

        loop {
            ticker.tick().await;

            if let Err(e) = self.cycle().await {
                tracing::error!("Reminder cycle error: {:?}", e);
                // Keep polling even on error
            }
        }
    }

    async fn cycle(&mut self) -> Result<()> {
        let now = Utc::now().with_timezone(&self.tz);
        tracing::debug!("Running reminder check at {}", now.format("%Y-%m-%d %H:%M:%S"));

        let evicted = self.engine.evict_stale(now.with_timezone(&Utc));
        if evicted > 0 {
            tracing::debug!("Dropped {} stale dedup entries", evicted);
        }

        let (time_min, time_max) = fetch_window(
            now.with_timezone(&Utc),
            self.config.fetch_lookbehind_mins,
            self.config.fetch_lookahead_mins,
        );
        let events = self
            .client
            .list_window(time_min, time_max, self.config.max_results)
            .await?;

        if events.is_empty() {
            tracing::debug!("No events in the current check window");
            return Ok(());
        }

        let notifications = self.engine.evaluate(&events, now);
        tracing::debug!(
            "{} events in window, {} notifications due, {} tracked",
            events.len(),
            notifications.len(),
            self.engine.tracked_events()
        );

        for notification in &notifications {
            self.notifier.notify(&notification.title, &notification.message);
            tracing::info!(
                "Sent {} reminder for event {}",
                notification.milestone,
                notification.event_id
            );
        }

        Ok(())
    }
}

/// Fetch window for one cycle: [now − lookbehind, now + lookahead].
fn fetch_window(
    now: DateTime<Utc>,
    lookbehind_mins: i64,
    lookahead_mins: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - Duration::minutes(lookbehind_mins),
        now + Duration::minutes(lookahead_mins),
    )
}
