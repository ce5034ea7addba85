//! Core library for the `skycast` CLI.
//!
//! This crate defines:
//! - The forecast synchronization pipeline (resolve, request, fetch, parse,
//!   replace, notify)
//! - Configuration & user-preference handling
//! - The forecast store queried by presentation code
//!
//! It is used by `skycast-cli`, but can also be reused by other binaries or
//! services.

pub mod config;
pub mod date;
pub mod fetch;
pub mod location;
pub mod model;
pub mod notify;
pub mod parse;
pub mod prefs;
pub mod request;
pub mod store;
pub mod sync;

pub use config::Config;
pub use fetch::{ForecastFetcher, HttpFetcher};
pub use location::LocationResolver;
pub use model::{Coordinates, ForecastDay, LocationQuery, SyncOutcome, SyncReason};
pub use notify::NotificationSink;
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore, Preferences};
pub use store::{FileStore, ForecastStore, MemoryStore};
pub use sync::SyncOrchestrator;
