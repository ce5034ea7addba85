//! Forecast response parsing.
//!
//! The raw body is deserialized into schema-typed intermediate structs first;
//! every provider field is optional there, so absent or malformed fields
//! surface as explicit `None` values instead of lookup failures. Field
//! extraction and date assignment then run over the typed form.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::date::{DAY_MILLIS, day_start};
use crate::model::{Coordinates, ForecastDay, UNKNOWN_CONDITION};

const COD_OK: i64 = 200;
const COD_NOT_FOUND: i64 = 404;

/// Parse failure. `Json` is transport-adjacent (malformed body); `MissingDay`
/// means the payload was well-formed but cannot satisfy the day-count
/// invariant, so no output is produced at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed forecast body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("forecast list has no entry for day {index} (need {needed} days)")]
    MissingDay { index: usize, needed: usize },
}

/// Outcome of parsing a structurally valid response.
#[derive(Debug, PartialEq)]
pub enum ParsedForecast {
    /// A complete day set, plus the city coordinates when the payload
    /// carried them. The parser only reports coordinates; persisting them is
    /// the orchestrator's call.
    Days { days: Vec<ForecastDay>, city_coordinates: Option<Coordinates> },
    /// Provider says the requested location does not exist (`cod` 404).
    LocationInvalid,
    /// Provider reported some other non-OK `cod`.
    ServerError(i64),
    /// No `list` section in the payload.
    NoData,
}

/// Parses a raw forecast body into exactly `day_count` normalized days.
///
/// Day `i` is dated `day_start(reference_now) + i * DAY_MILLIS`; the
/// provider's list order is trusted to be chronological and is not re-sorted.
pub fn parse_forecast(
    raw: &str,
    day_count: u32,
    reference_now: DateTime<FixedOffset>,
) -> Result<ParsedForecast, ParseError> {
    let doc: RawForecast = serde_json::from_str(raw)?;

    // The status field is optional; absence means OK.
    if let Some(cod) = doc.cod {
        match cod.0 {
            COD_OK => {}
            COD_NOT_FOUND => return Ok(ParsedForecast::LocationInvalid),
            other => return Ok(ParsedForecast::ServerError(other)),
        }
    }

    let Some(list) = doc.list else {
        return Ok(ParsedForecast::NoData);
    };

    let needed = day_count as usize;
    let start = day_start(reference_now);

    let mut days = Vec::with_capacity(needed);
    for i in 0..needed {
        // A short list is fatal: downstream consumers assume one row per
        // offset, so partial day sets must never be produced.
        let entry = list.get(i).ok_or(ParseError::MissingDay { index: i, needed })?;
        days.push(entry.to_day(start + i as i64 * DAY_MILLIS));
    }

    let city_coordinates = doc
        .city
        .and_then(|c| c.coord)
        .and_then(|c| match (c.lat, c.lon) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        });

    debug!(days = days.len(), has_coords = city_coordinates.is_some(), "parsed forecast");

    Ok(ParsedForecast::Days { days, city_coordinates })
}

/// Provider status code; real responses encode it as either a number or a
/// string ("404"), so accept both.
#[derive(Debug)]
struct StatusCode(i64);

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrString {
            Number(i64),
            String(String),
        }

        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(StatusCode(n)),
            NumberOrString::String(s) => {
                s.parse().map(StatusCode).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    cod: Option<StatusCode>,
    city: Option<RawCity>,
    list: Option<Vec<RawDay>>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    coord: Option<RawCoord>,
}

#[derive(Debug, Deserialize)]
struct RawCoord {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    pressure: Option<f64>,
    humidity: Option<f64>,
    speed: Option<f64>,
    deg: Option<f64>,
    temp: Option<RawTemp>,
    weather: Option<Vec<RawWeather>>,
}

#[derive(Debug, Deserialize)]
struct RawTemp {
    max: Option<f64>,
    min: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawWeather {
    id: Option<i64>,
}

impl RawDay {
    /// Missing per-day fields are tolerated with explicit defaults
    /// (temperatures 0.0, condition -1); the provider is lenient and so is
    /// the consumer.
    fn to_day(&self, date: i64) -> ForecastDay {
        let temp = self.temp.as_ref();
        let condition_id = self
            .weather
            .as_deref()
            .and_then(<[RawWeather]>::first)
            .and_then(|w| w.id)
            .and_then(|id| i32::try_from(id).ok())
            .unwrap_or(UNKNOWN_CONDITION);

        ForecastDay {
            date,
            pressure: self.pressure.unwrap_or(0.0),
            humidity: self.humidity.unwrap_or(0.0),
            wind_speed: self.speed.unwrap_or(0.0),
            wind_direction: self.deg.unwrap_or(0.0),
            high_temp: temp.and_then(|t| t.max).unwrap_or(0.0),
            low_temp: temp.and_then(|t| t.min).unwrap_or(0.0),
            condition_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon_utc() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2023, 11, 14, 12, 0, 0)
            .unwrap()
    }

    fn entry(high: f64) -> String {
        format!(
            r#"{{"pressure":1012.5,"humidity":60,"speed":4.2,"deg":180,
                "weather":[{{"id":800}}],"temp":{{"max":{high},"min":3.0}}}}"#
        )
    }

    fn body_with_days(n: usize) -> String {
        let entries: Vec<String> = (0..n).map(|i| entry(10.0 + i as f64)).collect();
        format!(r#"{{"cod":200,"list":[{}]}}"#, entries.join(","))
    }

    #[test]
    fn parses_exactly_day_count_records() {
        let parsed = parse_forecast(&body_with_days(5), 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { days, .. } = parsed else {
            panic!("expected days, got {parsed:?}");
        };

        assert_eq!(days.len(), 5);
        for pair in days.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, DAY_MILLIS);
        }
        assert_eq!(days[0].date % DAY_MILLIS, 0);
        assert_eq!(days[0].high_temp, 10.0);
        assert_eq!(days[4].high_temp, 14.0);
        assert_eq!(days[0].condition_id, 800);
        assert_eq!(days[0].pressure, 1012.5);
    }

    #[test]
    fn extra_provider_days_beyond_count_are_ignored() {
        let parsed = parse_forecast(&body_with_days(14), 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { days, .. } = parsed else {
            panic!("expected days");
        };
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn short_list_is_a_missing_day_error() {
        let err = parse_forecast(&body_with_days(3), 5, noon_utc()).unwrap_err();
        match err {
            ParseError::MissingDay { index, needed } => {
                assert_eq!(index, 3);
                assert_eq!(needed, 5);
            }
            other => panic!("expected MissingDay, got {other:?}"),
        }
    }

    #[test]
    fn cod_404_is_location_invalid() {
        let parsed = parse_forecast(r#"{"cod":404,"message":"city not found"}"#, 5, noon_utc())
            .expect("parse");
        assert_eq!(parsed, ParsedForecast::LocationInvalid);
    }

    #[test]
    fn cod_as_string_is_accepted() {
        let parsed = parse_forecast(r#"{"cod":"404"}"#, 5, noon_utc()).expect("parse");
        assert_eq!(parsed, ParsedForecast::LocationInvalid);
    }

    #[test]
    fn non_ok_cod_is_server_error() {
        let parsed = parse_forecast(r#"{"cod":500}"#, 5, noon_utc()).expect("parse");
        assert_eq!(parsed, ParsedForecast::ServerError(500));
    }

    #[test]
    fn missing_cod_is_treated_as_ok() {
        let body = body_with_days(5).replacen(r#""cod":200,"#, "", 1);
        let parsed = parse_forecast(&body, 5, noon_utc()).expect("parse");
        assert!(matches!(parsed, ParsedForecast::Days { .. }));
    }

    #[test]
    fn missing_list_is_no_data() {
        let parsed = parse_forecast(r#"{"cod":200}"#, 5, noon_utc()).expect("parse");
        assert_eq!(parsed, ParsedForecast::NoData);
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let err = parse_forecast("<html>not json</html>", 5, noon_utc()).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn missing_fields_fall_back_to_lenient_defaults() {
        let body = r#"{"cod":200,"list":[{},{},{},{},{}]}"#;
        let parsed = parse_forecast(body, 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { days, .. } = parsed else {
            panic!("expected days");
        };

        assert_eq!(days[0].high_temp, 0.0);
        assert_eq!(days[0].low_temp, 0.0);
        assert_eq!(days[0].pressure, 0.0);
        assert_eq!(days[0].condition_id, UNKNOWN_CONDITION);
    }

    #[test]
    fn condition_id_outside_i32_range_becomes_unknown() {
        let body = format!(
            r#"{{"cod":200,"list":[{{"weather":[{{"id":99999999999}}]}},{},{},{},{}]}}"#,
            entry(1.0),
            entry(1.0),
            entry(1.0),
            entry(1.0),
        );
        let parsed = parse_forecast(&body, 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { days, .. } = parsed else {
            panic!("expected days");
        };

        assert_eq!(days[0].condition_id, UNKNOWN_CONDITION);
        assert_eq!(days[1].condition_id, 800);
    }

    #[test]
    fn city_coordinates_are_surfaced() {
        let body = format!(
            r#"{{"cod":200,"city":{{"coord":{{"lat":40.7,"lon":-74.0}}}},"list":[{}]}}"#,
            (0..5).map(|_| entry(1.0)).collect::<Vec<_>>().join(","),
        );
        let parsed = parse_forecast(&body, 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { city_coordinates, .. } = parsed else {
            panic!("expected days");
        };

        let coords = city_coordinates.expect("coords present");
        assert_eq!(coords.latitude, 40.7);
        assert_eq!(coords.longitude, -74.0);
    }

    #[test]
    fn out_of_range_city_coordinates_are_dropped() {
        let body = format!(
            r#"{{"cod":200,"city":{{"coord":{{"lat":400.0,"lon":-74.0}}}},"list":[{}]}}"#,
            (0..5).map(|_| entry(1.0)).collect::<Vec<_>>().join(","),
        );
        let parsed = parse_forecast(&body, 5, noon_utc()).expect("parse");
        let ParsedForecast::Days { city_coordinates, .. } = parsed else {
            panic!("expected days");
        };
        assert!(city_coordinates.is_none());
    }

    #[test]
    fn start_day_follows_the_local_calendar() {
        // 23:30 at UTC-05:00 on Nov 14 is Nov 15 in UTC, but day 0 must be
        // the local day, Nov 14.
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let late_evening = zone.with_ymd_and_hms(2023, 11, 14, 23, 30, 0).unwrap();

        let parsed = parse_forecast(&body_with_days(5), 5, late_evening).expect("parse");
        let ParsedForecast::Days { days, .. } = parsed else {
            panic!("expected days");
        };

        let utc = FixedOffset::east_opt(0).unwrap();
        let nov_14 = utc.with_ymd_and_hms(2023, 11, 14, 0, 0, 0).unwrap();
        assert_eq!(days[0].date, nov_14.timestamp_millis());
    }
}
