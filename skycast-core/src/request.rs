use anyhow::{Context, Result};
use reqwest::Url;

use crate::model::LocationQuery;

/// Builds the fully parameterized forecast request URL.
///
/// The place-name and coordinate parameter sets are mutually exclusive; units
/// are fixed to metric and the response format to JSON. A malformed base URL
/// is an error, never a partially built URL.
pub fn build_forecast_url(base_url: &str, query: &LocationQuery, day_count: u32) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("Invalid forecast base URL: {base_url}"))?;

    {
        let mut params = url.query_pairs_mut();
        match query {
            LocationQuery::PlaceName(name) => {
                params.append_pair("q", name);
            }
            LocationQuery::Coordinates(coords) => {
                params.append_pair("lat", &coords.latitude.to_string());
                params.append_pair("lon", &coords.longitude.to_string());
            }
        }
        params.append_pair("units", "metric");
        params.append_pair("mode", "json");
        params.append_pair("cnt", &day_count.to_string());
    }

    Ok(url)
}
