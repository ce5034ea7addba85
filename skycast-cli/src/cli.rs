use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use skycast_core::{
    Config, FilePreferences, FileStore, ForecastStore, HttpFetcher, NotificationSink,
    PreferenceStore, SyncOrchestrator, SyncReason,
    date,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather forecast sync CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the forecast now and replace the stored dataset.
    Sync,

    /// Print the stored forecast from today onward.
    Show,

    /// Change the forecast location.
    SetLocation {
        /// Place name, e.g. "Oslo" or "New York,US".
        place: String,
    },

    /// Enable or disable "new weather" notifications.
    Notifications {
        /// "on" or "off".
        #[arg(value_parser = parse_on_off)]
        enabled: bool,
    },
}

fn parse_on_off(value: &str) -> Result<bool, String> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected \"on\" or \"off\", got \"{other}\"")),
    }
}

/// Prints the notification to the terminal; stands in for a platform
/// notification service.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify_new_weather(&self) {
        println!("New weather is available! Run `skycast show` to see it.");
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Sync => {
                let outcome = build_orchestrator()?.resync(SyncReason::Scheduled).await;
                println!("Sync finished: {outcome}");
            }
            Command::Show => {
                let store = FileStore::open_default()?;
                show_forecast(&store)?;
            }
            Command::SetLocation { place } => {
                let prefs = FilePreferences::open_default()?;
                prefs
                    .set_place_name(&place)
                    .with_context(|| format!("Failed to store place name: {place}"))?;

                // The changed preference both invalidates stale coordinates
                // and triggers an immediate refresh.
                let outcome = build_orchestrator()?.resync(SyncReason::PreferenceChanged).await;
                println!("Location set to {place}; sync finished: {outcome}");
            }
            Command::Notifications { enabled } => {
                let prefs = FilePreferences::open_default()?;
                prefs.set_notifications_enabled(enabled)?;
                println!("Notifications {}", if enabled { "enabled" } else { "disabled" });
            }
        }

        Ok(())
    }
}

fn build_orchestrator() -> Result<SyncOrchestrator> {
    let config = Config::load()?;
    let fetcher = HttpFetcher::new(config.fetch_timeout())?;

    Ok(SyncOrchestrator::new(
        &config,
        Arc::new(FilePreferences::open_default()?),
        Arc::new(FileStore::open_default()?),
        Arc::new(fetcher),
        Arc::new(ConsoleSink),
    ))
}

fn show_forecast(store: &dyn ForecastStore) -> Result<()> {
    let today = date::day_start(Local::now().fixed_offset());
    let days = store.query_from(today)?;

    if days.is_empty() {
        println!("No stored forecast. Run `skycast sync` first.");
        return Ok(());
    }

    for day in days {
        let date = DateTime::<Utc>::from_timestamp_millis(day.date)
            .map(|d| d.format("%a %Y-%m-%d").to_string())
            .unwrap_or_else(|| day.date.to_string());

        println!(
            "{date}  {:>5.1}°C / {:>5.1}°C  humidity {:>3.0}%  wind {:>4.1} m/s @ {:.0}°  (condition {})",
            day.high_temp, day.low_temp, day.humidity, day.wind_speed, day.wind_direction,
            day.condition_id,
        );
    }

    Ok(())
}
