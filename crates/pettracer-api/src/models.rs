// ── Vendor wire model ──
//
// Field names mirror the petTracer JSON payload (`bat`, `lastPos`,
// `modeSet`, ...). Everything except the collar id is optional, and
// unknown fields are ignored so firmware additions never break decoding.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One collar as returned by the device listing endpoint.
///
/// Every field decodes leniently: a value of the wrong type is read as
/// absent instead of failing the whole device list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    /// Account-scoped collar id. The API sends it as a number on some
    /// accounts and as a string on others.
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<String>,
    /// Battery voltage in millivolts.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub bat: Option<i32>,
    /// Dropped entirely when latitude or longitude is not a number.
    #[serde(default, deserialize_with = "lenient::value")]
    pub last_pos: Option<RawPosition>,
    #[serde(default)]
    pub last_contact: Option<RawTimestamp>,
    #[serde(default, deserialize_with = "lenient::value")]
    pub status: Option<OpaqueCode>,
    #[serde(default, deserialize_with = "lenient::value")]
    pub mode: Option<OpaqueCode>,
    /// Charging flag: `1` charging, `0` not charging.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub chg: Option<i64>,
    /// Tracking mode: `1` fast, `2` normal, `3` slow.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub mode_set: Option<i64>,
    /// Live tracking ("search") enabled.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub search: Option<bool>,
    #[serde(default, deserialize_with = "lenient::value")]
    pub details: Option<RawDetails>,
}

/// Last GPS fix reported by a collar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub pos_lat: f64,
    pub pos_long: f64,
    /// Horizontal accuracy in meters.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub acc: Option<i32>,
    /// Satellites used for the fix.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub sat: Option<i32>,
    /// Received signal strength in dBm.
    #[serde(default, deserialize_with = "lenient::integer")]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub time_measure: Option<RawTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDetails {
    #[serde(default, deserialize_with = "lenient::value")]
    pub name: Option<String>,
}

/// A timestamp as it arrives from the API.
///
/// Either already a valid RFC 3339 instant, a Unix epoch number, free-form
/// text, or something else entirely. Everything but `At` is left for the
/// consumer to coerce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    At(DateTime<Utc>),
    /// Seconds since the epoch, or milliseconds for values past
    /// [`EPOCH_MILLIS_THRESHOLD`].
    Epoch(i64),
    Text(String),
    Other(serde_json::Value),
}

/// Epoch values at or above this are read as milliseconds.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl From<&str> for RawTimestamp {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Small status/mode code passed through without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueCode {
    Int(i64),
    Text(String),
}

impl fmt::Display for OpaqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ── Lenient field decoders ─────────────────────────────────────────
//
// Each one buffers the field as a `serde_json::Value` and only fails on
// malformed JSON. A value of the wrong shape decodes as `None`.

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Largest magnitude an `f64` holds without losing integer precision.
    const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

    pub fn value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.and_then(|v| T::deserialize(v).ok()))
    }

    /// Integers, integral floats (`3700.0`), and numeric strings.
    pub fn integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(as_integer)
            .and_then(|n| T::try_from(n).ok()))
    }

    /// Booleans, or `0` / `1`.
    pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::Bool(b)) => Some(b),
            Some(other) => match as_integer(&other) {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            None => None,
        })
    }

    /// Numbers and strings both become the string form.
    pub fn id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(s)) => Some(s),
            Some(number @ Value::Number(_)) => as_integer(&number).map(|n| n.to_string()),
            _ => None,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    fn as_integer(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract().abs() < f64::EPSILON && f.abs() < MAX_EXACT_FLOAT)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_becomes_string() {
        let dev: RawDevice = serde_json::from_value(json!({ "id": 4711 })).unwrap();
        assert_eq!(dev.id.as_deref(), Some("4711"));
    }

    #[test]
    fn null_and_missing_id_are_absent() {
        let missing: RawDevice = serde_json::from_value(json!({ "bat": 3900 })).unwrap();
        let null: RawDevice = serde_json::from_value(json!({ "id": null })).unwrap();
        assert!(missing.id.is_none());
        assert!(null.id.is_none());
    }

    #[test]
    fn timestamp_falls_back_to_text() {
        let ts: RawTimestamp = serde_json::from_value(json!("2024-05-01T10:00:00Z")).unwrap();
        assert!(matches!(ts, RawTimestamp::At(_)));

        let ts: RawTimestamp = serde_json::from_value(json!("yesterday-ish")).unwrap();
        assert_eq!(ts, RawTimestamp::Text("yesterday-ish".into()));
    }

    #[test]
    fn timestamp_accepts_epoch_and_anything_else() {
        let ts: RawTimestamp = serde_json::from_value(json!(1_717_000_000)).unwrap();
        assert_eq!(ts, RawTimestamp::Epoch(1_717_000_000));

        let ts: RawTimestamp = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(ts, RawTimestamp::Other(json!(1.5)));

        let ts: RawTimestamp = serde_json::from_value(json!({ "when": "now" })).unwrap();
        assert!(matches!(ts, RawTimestamp::Other(_)));
    }

    #[test]
    fn integers_tolerate_floats_and_strings() {
        let dev: RawDevice = serde_json::from_value(json!({
            "id": 7.0,
            "bat": 3700.0,
            "chg": "1",
            "modeSet": 2.5,
        }))
        .unwrap();

        assert_eq!(dev.id.as_deref(), Some("7"));
        assert_eq!(dev.bat, Some(3700));
        assert_eq!(dev.chg, Some(1));
        assert_eq!(dev.mode_set, None);
    }

    #[test]
    fn mistyped_scalars_become_absent() {
        let dev: RawDevice = serde_json::from_value(json!({
            "id": true,
            "bat": "full",
            "chg": [1],
            "modeSet": { "value": 2 },
            "search": "yes",
            "status": 1.5,
            "mode": null,
            "details": "Mira",
        }))
        .unwrap();

        assert_eq!(dev, RawDevice::default());
    }

    #[test]
    fn out_of_range_integer_is_absent() {
        let dev: RawDevice = serde_json::from_value(json!({ "bat": 5_000_000_000_i64 })).unwrap();
        assert_eq!(dev.bat, None);
    }

    #[test]
    fn search_flag_accepts_zero_and_one() {
        let on: RawDevice = serde_json::from_value(json!({ "search": 1 })).unwrap();
        let off: RawDevice = serde_json::from_value(json!({ "search": 0 })).unwrap();
        let odd: RawDevice = serde_json::from_value(json!({ "search": 2 })).unwrap();
        assert_eq!(on.search, Some(true));
        assert_eq!(off.search, Some(false));
        assert_eq!(odd.search, None);
    }

    #[test]
    fn position_without_coordinates_is_dropped() {
        let null_lat: RawDevice = serde_json::from_value(json!({
            "lastPos": { "posLat": null, "posLong": 13.4, "sat": 7 }
        }))
        .unwrap();
        let text_long: RawDevice = serde_json::from_value(json!({
            "lastPos": { "posLat": 52.5, "posLong": "east" }
        }))
        .unwrap();
        let not_object: RawDevice = serde_json::from_value(json!({ "lastPos": 42 })).unwrap();

        assert!(null_lat.last_pos.is_none());
        assert!(text_long.last_pos.is_none());
        assert!(not_object.last_pos.is_none());
    }

    #[test]
    fn position_keeps_coordinates_when_extras_are_mistyped() {
        let dev: RawDevice = serde_json::from_value(json!({
            "lastPos": {
                "posLat": 52.5,
                "posLong": 13.4,
                "acc": "n/a",
                "sat": 7.0,
                "rssi": -71,
                "timeMeasure": false
            }
        }))
        .unwrap();

        let pos = dev.last_pos.unwrap();
        assert_eq!(pos.acc, None);
        assert_eq!(pos.sat, Some(7));
        assert_eq!(pos.rssi, Some(-71));
        assert_eq!(pos.time_measure, Some(RawTimestamp::Other(json!(false))));
    }

    #[test]
    fn opaque_code_displays_verbatim() {
        assert_eq!(OpaqueCode::Int(3).to_string(), "3");
        assert_eq!(OpaqueCode::Text("sleep".into()).to_string(), "sleep");
    }
}
