// ── API-to-domain conversion ──
//
// Turns raw `pettracer_api` wire types into the canonical `Device` and
// builds the keyed `Snapshot` for one fetch cycle. Field coercion never
// fails a cycle: anything unparseable becomes an absent field.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, warn};

use pettracer_api::{EPOCH_MILLIS_THRESHOLD, RawDetails, RawDevice, RawPosition, RawTimestamp};

use crate::model::{ChargingState, Device, DeviceId, Position, TrackingMode};
use crate::store::Snapshot;

/// Offset-less layouts accepted after RFC 3339 fails; read as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ── Snapshot ───────────────────────────────────────────────────────

/// Build a snapshot from one fetch result.
///
/// Entries without an id (absent or empty) are dropped. When the same
/// id appears more than once the later entry wins.
pub fn normalize(raw_devices: impl IntoIterator<Item = RawDevice>) -> Snapshot {
    let mut devices: IndexMap<DeviceId, Arc<Device>> = IndexMap::new();
    let mut dropped = 0_usize;

    for raw in raw_devices {
        match device_from_raw(raw) {
            Some(device) => {
                devices.insert(device.id.clone(), Arc::new(device));
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "skipped devices without an id");
    }

    Snapshot::from_map(devices)
}

/// Normalize a single wire device. `None` when it has no usable id.
pub fn device_from_raw(raw: RawDevice) -> Option<Device> {
    let id = raw.id.filter(|id| !id.is_empty())?;

    Some(Device {
        name: raw.details.and_then(|d| d.name),
        last_position: raw.last_pos.map(|p| position_from_raw(p, &id)),
        battery_millivolts: raw.bat,
        last_contact_at: coerce_timestamp(raw.last_contact, "lastContact", &id),
        status: raw.status,
        mode: raw.mode,
        charging: ChargingState::from_flag(raw.chg),
        tracking_mode: raw.mode_set.map(TrackingMode::from_code),
        live_tracking: raw.search,
        id: DeviceId::from(id),
    })
}

fn position_from_raw(raw: RawPosition, device_id: &str) -> Position {
    Position {
        latitude: raw.pos_lat,
        longitude: raw.pos_long,
        accuracy: raw.acc,
        satellite_count: raw.sat,
        signal_strength: raw.rssi,
        measured_at: coerce_timestamp(raw.time_measure, "timeMeasure", device_id),
    }
}

// ── Timestamps ─────────────────────────────────────────────────────

fn coerce_timestamp(
    raw: Option<RawTimestamp>,
    field: &'static str,
    device_id: &str,
) -> Option<DateTime<Utc>> {
    match raw? {
        RawTimestamp::At(at) => Some(at),
        RawTimestamp::Epoch(epoch) => {
            let parsed = from_epoch(epoch);
            if parsed.is_none() {
                warn!(device = device_id, field, epoch, "epoch timestamp out of range");
            }
            parsed
        }
        RawTimestamp::Text(text) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() {
                warn!(device = device_id, field, value = %text, "failed to parse timestamp");
            }
            parsed
        }
        RawTimestamp::Other(value) => {
            warn!(device = device_id, field, %value, "timestamp has an unsupported type");
            None
        }
    }
}

/// Unix epoch in seconds, or milliseconds at and past
/// [`EPOCH_MILLIS_THRESHOLD`].
pub fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

/// Parse an ISO-8601 timestamp, with or without offset.
///
/// Offset-less values are taken as UTC. Returns `None` for anything
/// else; never panics.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .map(|naive| naive.and_utc())
}

// ── Domain-to-API (re-normalization, fixtures) ─────────────────────

impl From<&Position> for RawPosition {
    fn from(p: &Position) -> Self {
        Self {
            pos_lat: p.latitude,
            pos_long: p.longitude,
            acc: p.accuracy,
            sat: p.satellite_count,
            rssi: p.signal_strength,
            time_measure: p.measured_at.map(RawTimestamp::At),
        }
    }
}

impl From<&Device> for RawDevice {
    fn from(d: &Device) -> Self {
        Self {
            id: Some(d.id.to_string()),
            bat: d.battery_millivolts,
            last_pos: d.last_position.as_ref().map(RawPosition::from),
            last_contact: d.last_contact_at.map(RawTimestamp::At),
            status: d.status.clone(),
            mode: d.mode.clone(),
            chg: d.charging.as_flag(),
            mode_set: d.tracking_mode.map(TrackingMode::code),
            search: d.live_tracking,
            details: d.name.as_ref().map(|name| RawDetails {
                name: Some(name.clone()),
            }),
        }
    }
}
