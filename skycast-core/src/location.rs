use anyhow::Result;
use tracing::debug;

use crate::model::{Coordinates, LocationQuery};
use crate::prefs::PreferenceStore;

/// Decides how the forecast endpoint is asked about the user's location.
///
/// A coordinate pair resolved from an earlier fetch takes precedence over the
/// free-text place name; a place-name change invalidates the pair so the new
/// name is not shadowed by stale coordinates.
pub struct LocationResolver<'a> {
    prefs: &'a dyn PreferenceStore,
}

impl<'a> LocationResolver<'a> {
    pub fn new(prefs: &'a dyn PreferenceStore) -> Self {
        Self { prefs }
    }

    /// The query to use for the next request.
    pub fn resolve(&self) -> Result<LocationQuery> {
        if let Some(coords) = self.prefs.coordinates()? {
            return Ok(LocationQuery::Coordinates(coords));
        }
        Ok(LocationQuery::PlaceName(self.prefs.place_name()?))
    }

    /// Hook for "the location preference changed": drops any resolved
    /// coordinates so the next request uses the new place name.
    pub fn invalidate_coordinates(&self) -> Result<()> {
        self.prefs.clear_coordinates()
    }

    /// Persists coordinates reported by a successful fetch. Out-of-range
    /// values are dropped silently; they must never reach the store.
    pub fn set_resolved_coordinates(&self, latitude: f64, longitude: f64) -> Result<()> {
        match Coordinates::new(latitude, longitude) {
            Some(coords) => self.prefs.set_coordinates(coords),
            None => {
                debug!(latitude, longitude, "ignoring out-of-range resolved coordinates");
                Ok(())
            }
        }
    }
}
