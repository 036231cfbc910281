// ── Exposed attributes ──
//
// One variant per value a collar exposes to the host. Each variant owns
// a pure derivation over `Device`, so every display of e.g. the battery
// level goes through the same function.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Device;

/// A value exposed per device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::EnumIter,
    strum::EnumCount,
)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    BatteryLevel,
    BatteryVoltage,
    SignalStrength,
    LastContact,
    Satellites,
    ChargingStatus,
    TrackingMode,
    LiveTracking,
}

/// Derived attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Text(&'static str),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl AttributeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&'static str> {
        match self {
            Self::Text(s) => Some(*s),
            _ => None,
        }
    }
}

type Derive = fn(&Device) -> Option<AttributeValue>;

struct Descriptor {
    key: &'static str,
    name: &'static str,
    unit: Option<&'static str>,
    enabled_by_default: bool,
    derive: Derive,
}

impl Attribute {
    fn descriptor(self) -> Descriptor {
        match self {
            Self::BatteryLevel => Descriptor {
                key: "battery_level",
                name: "Battery Level",
                unit: Some("%"),
                enabled_by_default: true,
                derive: |d| d.battery_percent().map(|p| AttributeValue::Integer(i64::from(p))),
            },
            Self::BatteryVoltage => Descriptor {
                key: "battery_voltage",
                name: "Battery Voltage",
                unit: Some("mV"),
                enabled_by_default: false,
                derive: |d| d.battery_millivolts.map(|mv| AttributeValue::Integer(i64::from(mv))),
            },
            Self::SignalStrength => Descriptor {
                key: "signal_strength",
                name: "Signal Strength",
                unit: Some("dBm"),
                enabled_by_default: false,
                derive: |d| {
                    d.last_position
                        .as_ref()
                        .and_then(|p| p.signal_strength)
                        .map(|rssi| AttributeValue::Integer(i64::from(rssi)))
                },
            },
            Self::LastContact => Descriptor {
                key: "last_contact",
                name: "Last Contact",
                unit: None,
                enabled_by_default: true,
                derive: |d| d.last_contact_at.map(AttributeValue::Timestamp),
            },
            Self::Satellites => Descriptor {
                key: "satellites",
                name: "GPS Satellites",
                unit: None,
                enabled_by_default: true,
                derive: |d| {
                    d.last_position
                        .as_ref()
                        .and_then(|p| p.satellite_count)
                        .map(|sat| AttributeValue::Integer(i64::from(sat)))
                },
            },
            Self::ChargingStatus => Descriptor {
                key: "charging_status",
                name: "Charging Status",
                unit: None,
                enabled_by_default: true,
                derive: |d| d.charging_label().map(AttributeValue::Text),
            },
            Self::TrackingMode => Descriptor {
                key: "tracking_mode",
                name: "Tracking Mode",
                unit: None,
                enabled_by_default: true,
                derive: |d| d.tracking_mode_label().map(AttributeValue::Text),
            },
            Self::LiveTracking => Descriptor {
                key: "search_status",
                name: "Live Tracking",
                unit: None,
                enabled_by_default: true,
                derive: |d| d.live_tracking_label().map(AttributeValue::Text),
            },
        }
    }

    /// Stable key, used in unique ids.
    pub fn key(self) -> &'static str {
        self.descriptor().key
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn unit(self) -> Option<&'static str> {
        self.descriptor().unit
    }

    /// Hidden until the user enables it.
    pub fn enabled_by_default(self) -> bool {
        self.descriptor().enabled_by_default
    }

    /// Compute this attribute for `device`; `None` when the source field is absent.
    pub fn derive(self, device: &Device) -> Option<AttributeValue> {
        (self.descriptor().derive)(device)
    }

    /// Look up a variant by its key.
    pub fn from_key(key: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|a| a.key() == key)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
