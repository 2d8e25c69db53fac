use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use google_calendar3::api::{Event, EventAttendee, EventDateTime, EventReminder, EventReminders};
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::path::Path;

use reminder_core::{EventSnapshot, EventStart};

use crate::config::CalendarConfig;

/// Client for the Google Calendar API, scoped to one calendar.
pub struct CalendarClient {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
    calendar_id: String,
}

/// Event to be created in the calendar.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
    /// Lead time for the popup/email reminders attached to the event
    pub remind_minutes: i32,
}

impl CalendarClient {
    pub async fn new(config: &CalendarConfig) -> Result<Self> {
        let secret =
            google_calendar3::yup_oauth2::read_application_secret(&config.credentials_path)
                .await
                .context("Failed to read OAuth credentials")?;

        let auth = google_calendar3::yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            google_calendar3::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(Path::new(&config.token_cache_path))
        .build()
        .await
        .context("Failed to build authenticator")?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        Ok(Self {
            hub,
            calendar_id: config.calendar_id.clone(),
        })
    }

    /// List single (recurrence-expanded) events overlapping
    /// [`time_min`, `time_max`], sorted by start time ascending.
    pub async fn list_window(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: i32,
    ) -> Result<Vec<EventSnapshot>> {
        let (_, listing) = self
            .hub
            .events()
            .list(&self.calendar_id)
            .time_min(time_min)
            .time_max(time_max)
            .max_results(max_results)
            .single_events(true)
            .order_by("startTime")
            .doit()
            .await
            .context("Failed to list calendar events")?;

        let items = listing.items.unwrap_or_default();
        let mut snapshots = Vec::with_capacity(items.len());
        for item in items {
            if let Some(snapshot) = snapshot_from_api(item) {
                snapshots.push(snapshot);
            }
        }

        tracing::debug!(
            "Fetched {} events between {} and {}",
            snapshots.len(),
            time_min,
            time_max
        );
        Ok(snapshots)
    }

    /// Create an event with popup and email reminders attached, returning
    /// its HTML link.
    pub async fn create_event(&self, event: &NewEvent) -> Result<String> {
        let attendees = if event.attendees.is_empty() {
            None
        } else {
            Some(
                event
                    .attendees
                    .iter()
                    .map(|email| EventAttendee {
                        email: Some(email.clone()),
                        ..Default::default()
                    })
                    .collect(),
            )
        };

        let google_event = Event {
            summary: Some(event.summary.clone()),
            description: event.description.clone(),
            location: event.location.clone(),
            start: Some(EventDateTime {
                date_time: Some(event.start),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date_time: Some(event.end),
                ..Default::default()
            }),
            attendees,
            reminders: Some(EventReminders {
                use_default: Some(false),
                overrides: Some(vec![
                    EventReminder {
                        method: Some("email".to_string()),
                        minutes: Some(event.remind_minutes),
                    },
                    EventReminder {
                        method: Some("popup".to_string()),
                        minutes: Some(event.remind_minutes),
                    },
                ]),
            }),
            ..Default::default()
        };

        let (_, created) = self
            .hub
            .events()
            .insert(google_event, &self.calendar_id)
            .doit()
            .await
            .context("Failed to create calendar event")?;

        tracing::info!(
            "Created calendar event: {} (id: {:?})",
            event.summary,
            created.id
        );
        Ok(created.html_link.unwrap_or_else(|| "#".to_string()))
    }
}

/// Map one API item into an engine snapshot. Items missing an identifier
/// or a usable start are dropped with a warning.
fn snapshot_from_api(item: Event) -> Option<EventSnapshot> {
    let id = match item.id {
        Some(id) => id,
        None => {
            tracing::warn!("Skipping calendar item without an id");
            return None;
        }
    };

    let start = match item.start {
        Some(start) => start,
        None => {
            tracing::warn!("Skipping event {} without a start", id);
            return None;
        }
    };

    let start = if let Some(date_time) = start.date_time {
        EventStart::Timed(date_time.to_rfc3339())
    } else if let Some(date) = start.date {
        EventStart::AllDay(date.format("%Y-%m-%d").to_string())
    } else {
        tracing::warn!("Skipping event {} with an empty start", id);
        return None;
    };

    Some(EventSnapshot {
        id,
        summary: item.summary,
        html_link: item.html_link,
        start,
    })
}
