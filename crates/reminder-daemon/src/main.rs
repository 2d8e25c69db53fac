mod calendar;
mod config;
mod notifier;
mod scheduler;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::calendar::{CalendarClient, NewEvent};
use crate::config::Config;
use crate::notifier::DesktopNotifier;
use crate::scheduler::ReminderScheduler;

#[derive(Parser)]
#[command(name = "reminder-daemon")]
#[command(about = "Desktop reminders for upcoming Google Calendar events")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "reminder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the calendar and deliver reminders until interrupted (default)
    Run,
    /// Write an example configuration file and exit
    InitConfig,
    /// Create a calendar event from the command line
    Add(AddArgs),
}

#[derive(Args)]
struct AddArgs {
    /// Event title/summary
    #[arg(short, long)]
    summary: String,

    /// Event description
    #[arg(short, long)]
    description: Option<String>,

    /// Start time in format: "YYYY-MM-DD HH:MM" (config timezone)
    #[arg(long)]
    start: String,

    /// End time in format: "YYYY-MM-DD HH:MM" (config timezone)
    #[arg(long)]
    end: String,

    /// Location
    #[arg(short, long)]
    location: Option<String>,

    /// Attendee email (repeatable)
    #[arg(long = "attendee")]
    attendees: Vec<String>,

    /// Popup/email reminder lead time in minutes
    #[arg(long, default_value_t = 15)]
    remind_minutes: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install crypto provider");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reminder_daemon=info,reminder_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&cli.config).await,
        Command::InitConfig => init_config(&cli.config),
        Command::Add(args) => add_event(&cli.config, args).await,
    }
}

async fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;
    let tz = config.timezone()?;

    tracing::info!(
        "Starting calendar reminder daemon (timezone: {}, poll interval: {}s)",
        tz,
        config.poll_interval_secs
    );

    let client = CalendarClient::new(&config.calendar).await?;
    let scheduler = ReminderScheduler::new(client, DesktopNotifier::new(), config, tz);

    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run().await {
            tracing::error!("Scheduler error: {:?}", e);
        }
    });

    tracing::info!("Reminder daemon running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");

    scheduler_handle.abort();

    tracing::info!("Reminder daemon stopped");
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Refusing to overwrite existing config {}", path.display());
    }

    let rendered = toml::to_string_pretty(&Config::example())?;
    std::fs::write(path, rendered)?;
    println!("Wrote example configuration to {}", path.display());
    Ok(())
}

async fn add_event(config_path: &Path, args: AddArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let tz = config.timezone()?;

    let start = parse_local_datetime(&args.start, tz)?;
    let end = parse_local_datetime(&args.end, tz)?;
    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    let client = CalendarClient::new(&config.calendar).await?;

    let event = NewEvent {
        summary: args.summary.clone(),
        description: args.description,
        location: args.location,
        start,
        end,
        attendees: args.attendees,
        remind_minutes: args.remind_minutes,
    };

    println!("Adding event: {}", args.summary);
    println!("  Start: {} {} -> {} UTC", args.start, config.timezone, start);
    println!("  End:   {} {} -> {} UTC", args.end, config.timezone, end);

    let link = client.create_event(&event).await?;
    println!("Event added: {}", link);

    Ok(())
}

fn parse_local_datetime(s: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))?;

    let local_time = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow::anyhow!("Ambiguous or invalid local time: {}", s))?;

    Ok(local_time.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    #[test]
    fn parses_local_datetimes_in_both_accepted_formats() {
        let short = parse_local_datetime("2024-05-14 09:00", Kolkata).unwrap();
        let long = parse_local_datetime("2024-05-14 09:00:00", Kolkata).unwrap();

        assert_eq!(short, long);
        assert_eq!(short, Utc.with_ymd_and_hms(2024, 5, 14, 3, 30, 0).unwrap());
    }

    #[test]
    fn rejects_unparseable_local_datetimes() {
        assert!(parse_local_datetime("tomorrow at nine", Kolkata).is_err());
    }
}
