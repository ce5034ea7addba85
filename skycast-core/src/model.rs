use serde::{Deserialize, Serialize};

/// Condition code used when the provider omits the weather entry for a day.
pub const UNKNOWN_CONDITION: i32 = -1;

/// One normalized calendar day of forecast data, as stored and queried.
///
/// `date` is epoch milliseconds truncated to the day boundary; temperatures
/// are Celsius. `condition_id` is the provider's weather code, opaque to this
/// crate and interpreted only by presentation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: i64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub high_temp: f64,
    pub low_temp: f64,
    pub condition_id: i32,
}

/// A latitude/longitude pair. Construct through [`Coordinates::new`] so
/// out-of-range values never enter the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` when either component is outside the valid range
    /// (lat in [-90, 90], lon in [-180, 180]).
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Some(Self { latitude, longitude })
        } else {
            None
        }
    }
}

/// How the forecast endpoint should be asked about a location.
///
/// Exactly one variant is active per request; resolved coordinates take
/// precedence over the free-text place name until the place name changes.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    PlaceName(String),
    Coordinates(Coordinates),
}

/// Result of a single synchronization attempt. Produced fresh by every run
/// and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Forecast replaced; carries the number of stored days.
    Success(usize),
    /// Structurally valid response with no day list.
    NoData,
    /// Provider confirmed the requested location does not exist.
    LocationInvalid,
    /// Provider reported a non-OK status other than not-found.
    ServerError,
    /// Network, timeout, or malformed-body failure.
    TransportFailure,
    /// Parsed cleanly but an output invariant (e.g. day count) would break.
    ValidationFailure,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success(_))
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Success(n) => write!(f, "success ({n} days)"),
            SyncOutcome::NoData => f.write_str("no data"),
            SyncOutcome::LocationInvalid => f.write_str("location invalid"),
            SyncOutcome::ServerError => f.write_str("server error"),
            SyncOutcome::TransportFailure => f.write_str("transport failure"),
            SyncOutcome::ValidationFailure => f.write_str("validation failure"),
        }
    }
}

/// Why a sync run was requested. Passed explicitly into the orchestrator
/// instead of signalling through shared mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    Scheduled,
    PreferenceChanged,
}
