// ── Collar domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::device_id::DeviceId;
use pettracer_api::OpaqueCode;

/// Battery voltage treated as empty.
const BATTERY_EMPTY_MV: i32 = 3300;
/// Millivolts per percentage point; 3300 mV → 0 %, 4200 mV → 100 %.
const BATTERY_MV_PER_PCT: i32 = 9;

/// Approximate charge percentage for a battery voltage.
///
/// `clamp(0, 100, round((mV - 3300) / 9))`. Monotonic in `millivolts`.
pub fn battery_percent(millivolts: i32) -> u8 {
    let above_empty = millivolts.saturating_sub(BATTERY_EMPTY_MV);
    if above_empty <= 0 {
        return 0;
    }
    // Integer round-half-up of above_empty / 9.
    let pct = above_empty
        .saturating_mul(2)
        .saturating_add(BATTERY_MV_PER_PCT)
        / (2 * BATTERY_MV_PER_PCT);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// Last GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<i32>,
    pub satellite_count: Option<i32>,
    /// Signal strength in dBm.
    pub signal_strength: Option<i32>,
    pub measured_at: Option<DateTime<Utc>>,
}

/// Charging flag as reported upstream (`1` / `0` / absent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ChargingState {
    Charging,
    NotCharging,
    #[default]
    Unknown,
}

impl ChargingState {
    pub fn from_flag(flag: Option<i64>) -> Self {
        match flag {
            Some(1) => Self::Charging,
            Some(_) => Self::NotCharging,
            None => Self::Unknown,
        }
    }

    pub fn as_flag(self) -> Option<i64> {
        match self {
            Self::Charging => Some(1),
            Self::NotCharging => Some(0),
            Self::Unknown => None,
        }
    }

    /// Display label, `None` while unknown.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Charging => Some("Charging"),
            Self::NotCharging => Some("Not charging"),
            Self::Unknown => None,
        }
    }
}

/// GPS reporting cadence selected on the collar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum TrackingMode {
    Fast,
    Normal,
    Slow,
    /// Any code outside 1..=3; the raw code is kept for round-tripping.
    Unknown(i64),
}

impl TrackingMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Fast,
            2 => Self::Normal,
            3 => Self::Slow,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Fast => 1,
            Self::Normal => 2,
            Self::Slow => 3,
            Self::Unknown(code) => code,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fast => "Fast",
            Self::Normal => "Normal",
            Self::Slow => "Slow",
            Self::Unknown(_) => "Unknown",
        }
    }
}

/// One tracked collar, as of the last successful fetch.
///
/// Derived values (battery percentage, labels) are computed on demand
/// and never stored, so every consumer sees the same derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: Option<String>,
    pub last_position: Option<Position>,
    pub battery_millivolts: Option<i32>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub status: Option<OpaqueCode>,
    pub mode: Option<OpaqueCode>,
    pub charging: ChargingState,
    pub tracking_mode: Option<TrackingMode>,
    pub live_tracking: Option<bool>,
}

impl Device {
    /// Bare device carrying only its id.
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            last_position: None,
            battery_millivolts: None,
            last_contact_at: None,
            status: None,
            mode: None,
            charging: ChargingState::Unknown,
            tracking_mode: None,
            live_tracking: None,
        }
    }

    /// Configured pet name, or `"Pet Tracker {id}"`.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Pet Tracker {}", self.id))
    }

    pub fn battery_percent(&self) -> Option<u8> {
        self.battery_millivolts.map(battery_percent)
    }

    pub fn tracking_mode_label(&self) -> Option<&'static str> {
        self.tracking_mode.map(TrackingMode::label)
    }

    pub fn charging_label(&self) -> Option<&'static str> {
        self.charging.label()
    }

    pub fn live_tracking_label(&self) -> Option<&'static str> {
        self.live_tracking.map(|on| if on { "On" } else { "Off" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_percent_anchor_points() {
        assert_eq!(battery_percent(3300), 0);
        assert_eq!(battery_percent(3700), 44);
        assert_eq!(battery_percent(4200), 100);
        assert_eq!(battery_percent(3000), 0);
        assert_eq!(battery_percent(5000), 100);
    }

    #[test]
    fn battery_percent_rounds_to_nearest() {
        // 3305 mV → 0.56 % → 1
        assert_eq!(battery_percent(3305), 1);
        // 3304 mV → 0.44 % → 0
        assert_eq!(battery_percent(3304), 0);
    }

    #[test]
    fn battery_percent_is_monotonic_and_bounded() {
        let mut previous = 0;
        for mv in 2500..=5500 {
            let pct = battery_percent(mv);
            assert!(pct >= previous, "{mv} mV dropped from {previous} to {pct}");
            assert!(pct <= 100);
            previous = pct;
        }
    }

    #[test]
    fn battery_percent_survives_extremes() {
        assert_eq!(battery_percent(i32::MIN), 0);
        assert_eq!(battery_percent(i32::MAX), 100);
    }

    #[test]
    fn tracking_mode_mapping() {
        assert_eq!(TrackingMode::from_code(1).label(), "Fast");
        assert_eq!(TrackingMode::from_code(2).label(), "Normal");
        assert_eq!(TrackingMode::from_code(3).label(), "Slow");
        assert_eq!(TrackingMode::from_code(7).label(), "Unknown");
        assert_eq!(TrackingMode::from_code(7).code(), 7);
    }

    #[test]
    fn charging_flag_tri_state() {
        assert_eq!(ChargingState::from_flag(Some(1)), ChargingState::Charging);
        assert_eq!(ChargingState::from_flag(Some(0)), ChargingState::NotCharging);
        assert_eq!(ChargingState::from_flag(None), ChargingState::Unknown);
        assert_eq!(ChargingState::Unknown.label(), None);
        assert_eq!(ChargingState::NotCharging.label(), Some("Not charging"));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let mut device = Device::new("A17");
        assert_eq!(device.display_name(), "Pet Tracker A17");
        device.name = Some("Mira".into());
        assert_eq!(device.display_name(), "Mira");
    }

    #[test]
    fn absent_fields_derive_absent_values() {
        let device = Device::new("A");
        assert_eq!(device.battery_percent(), None);
        assert_eq!(device.tracking_mode_label(), None);
        assert_eq!(device.live_tracking_label(), None);
    }
}
