use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetch::ForecastFetcher;
use crate::location::LocationResolver;
use crate::model::{SyncOutcome, SyncReason};
use crate::notify::{NotificationSink, should_notify};
use crate::parse::{ParseError, ParsedForecast, parse_forecast};
use crate::prefs::PreferenceStore;
use crate::request::build_forecast_url;
use crate::store::ForecastStore;

/// Coordinates one synchronization run: resolve the location, build the
/// request, fetch, parse, replace the stored dataset, evaluate the
/// notification throttle.
///
/// Runs are serialized: a second `resync` arriving while one is in flight
/// waits for it to finish, so two runs can never interleave their
/// replace sequences. Nothing escapes [`SyncOrchestrator::resync`] as an
/// error; every failure terminates in a [`SyncOutcome`].
pub struct SyncOrchestrator {
    prefs: Arc<dyn PreferenceStore>,
    store: Arc<dyn ForecastStore>,
    fetcher: Arc<dyn ForecastFetcher>,
    sink: Arc<dyn NotificationSink>,
    base_url: String,
    day_count: u32,
    in_flight: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        config: &Config,
        prefs: Arc<dyn PreferenceStore>,
        store: Arc<dyn ForecastStore>,
        fetcher: Arc<dyn ForecastFetcher>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            prefs,
            store,
            fetcher,
            sink,
            base_url: config.base_url.clone(),
            day_count: config.day_count,
            in_flight: Mutex::new(()),
        }
    }

    /// Runs one synchronization attempt and reports its outcome.
    pub async fn resync(&self, reason: SyncReason) -> SyncOutcome {
        // Single flight: hold the lock across the whole fetch -> replace ->
        // notify sequence.
        let _flight = self.in_flight.lock().await;

        let outcome = match self.run(reason).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Pre-replace infrastructure failure (preferences, store,
                // URL build). Recoverable by a later sync, same as a
                // network fault; nothing was mutated.
                warn!(error = %err, "sync aborted");
                SyncOutcome::TransportFailure
            }
        };

        if outcome.is_success() {
            info!(%outcome, ?reason, "sync finished");
        } else {
            warn!(%outcome, ?reason, "sync finished without new data");
        }

        outcome
    }

    async fn run(&self, reason: SyncReason) -> Result<SyncOutcome> {
        let resolver = LocationResolver::new(self.prefs.as_ref());

        // A changed place name must not be shadowed by coordinates resolved
        // for the old one.
        if reason == SyncReason::PreferenceChanged {
            resolver.invalidate_coordinates().context("Failed to invalidate coordinates")?;
        }

        let query = resolver.resolve().context("Failed to resolve location")?;
        let url = build_forecast_url(&self.base_url, &query, self.day_count)?;

        let raw = match self.fetcher.fetch(url).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "forecast fetch failed");
                return Ok(SyncOutcome::TransportFailure);
            }
        };

        let (days, city_coordinates) =
            match parse_forecast(&raw, self.day_count, Local::now().fixed_offset()) {
                Ok(ParsedForecast::Days { days, city_coordinates }) => (days, city_coordinates),
                Ok(ParsedForecast::LocationInvalid) => return Ok(SyncOutcome::LocationInvalid),
                Ok(ParsedForecast::ServerError(cod)) => {
                    warn!(cod, "provider reported an error status");
                    return Ok(SyncOutcome::ServerError);
                }
                Ok(ParsedForecast::NoData) => return Ok(SyncOutcome::NoData),
                Err(ParseError::Json(err)) => {
                    warn!(error = %err, "forecast body is not valid JSON");
                    return Ok(SyncOutcome::TransportFailure);
                }
                Err(err @ ParseError::MissingDay { .. }) => {
                    warn!(error = %err, "forecast payload is incomplete");
                    return Ok(SyncOutcome::ValidationFailure);
                }
            };

        if days.is_empty() {
            return Ok(SyncOutcome::NoData);
        }

        let count = days.len();
        self.store.replace_all(days).context("Failed to replace stored forecast")?;

        // The replace has landed: the run is a success from here on, and the
        // remaining side effects must not turn the reported outcome into a
        // failure the store state contradicts.
        if let Some(coords) = city_coordinates {
            if let Err(err) = resolver.set_resolved_coordinates(coords.latitude, coords.longitude)
            {
                warn!(error = %err, "failed to persist resolved coordinates");
            }
        }

        if let Err(err) = self.maybe_notify() {
            warn!(error = %err, "notification path failed");
        }

        Ok(SyncOutcome::Success(count))
    }

    fn maybe_notify(&self) -> Result<()> {
        let enabled = self.prefs.notifications_enabled()?;
        let now = Utc::now();
        let elapsed = match self.prefs.last_notified_at()? {
            Some(last) => now.signed_duration_since(last),
            // Never notified: treat as arbitrarily long ago.
            None => Duration::MAX,
        };

        if should_notify(enabled, elapsed) {
            self.sink.notify_new_weather();
            // Update the timestamp only after the notification went out.
            self.prefs
                .set_last_notified_at(now)
                .context("Failed to record notification time")?;
        }

        Ok(())
    }
}
