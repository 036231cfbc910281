// ── Reference entities ──
//
// What a host exposes per collar: one GPS tracker plus one sensor per
// `Attribute`. Entities hold only the device id and resolve the device
// from the coordinator's current snapshot on every read.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use pettracer_api::{DeviceSource, OpaqueCode};

use crate::attribute::{Attribute, AttributeValue};
use crate::coordinator::Coordinator;
use crate::model::{Device, DeviceId};
use crate::store::Snapshot;

/// Integration domain; prefix of every unique id.
pub const DOMAIN: &str = "pettracer";
pub const MANUFACTURER: &str = "petTracer";
pub const MODEL: &str = "Pet Collar";

/// Device registry entry shared by all entities of one collar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: (&'static str, DeviceId),
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    fn new(device_id: &DeviceId, name: &str) -> Self {
        Self {
            identifiers: (DOMAIN, device_id.clone()),
            name: name.to_owned(),
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }
}

fn lookup<S: DeviceSource>(coordinator: &Coordinator<S>, id: &DeviceId) -> Option<Arc<Device>> {
    coordinator.device(id.as_str())
}

// ── Sensor ───────────────────────────────────────────────────────

/// One attribute of one collar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntity {
    pub device_id: DeviceId,
    pub device_name: String,
    pub attribute: Attribute,
}

impl SensorEntity {
    pub fn new(device_id: DeviceId, device_name: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
            attribute,
        }
    }

    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_{}_{}", self.device_id, self.attribute.key())
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.device_name, self.attribute.name())
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(&self.device_id, &self.device_name)
    }

    /// Last cycle succeeded and the collar is still in the snapshot.
    pub fn available<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> bool {
        coordinator.last_update_success()
            && coordinator.current_snapshot().contains(self.device_id.as_str())
    }

    pub fn value<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> Option<AttributeValue> {
        lookup(coordinator, &self.device_id).and_then(|device| self.attribute.derive(&device))
    }
}

// ── Tracker ──────────────────────────────────────────────────────

/// GPS position of one collar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEntity {
    pub device_id: DeviceId,
    pub device_name: String,
}

impl TrackerEntity {
    pub fn new(device_id: DeviceId, device_name: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
        }
    }

    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_{}", self.device_id)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(&self.device_id, &self.device_name)
    }

    pub fn available<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> bool {
        coordinator.last_update_success()
            && coordinator.current_snapshot().contains(self.device_id.as_str())
    }

    pub fn latitude<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> Option<f64> {
        lookup(coordinator, &self.device_id)?
            .last_position
            .as_ref()
            .map(|p| p.latitude)
    }

    pub fn longitude<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> Option<f64> {
        lookup(coordinator, &self.device_id)?
            .last_position
            .as_ref()
            .map(|p| p.longitude)
    }

    /// Accuracy radius in meters, 0 when unknown.
    pub fn location_accuracy<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> i32 {
        lookup(coordinator, &self.device_id)
            .and_then(|d| d.last_position.as_ref().and_then(|p| p.accuracy))
            .unwrap_or(0)
    }

    pub fn battery_level<S: DeviceSource>(&self, coordinator: &Coordinator<S>) -> Option<u8> {
        lookup(coordinator, &self.device_id)?.battery_percent()
    }

    /// Supplementary state. Keys appear only when the source field is present.
    pub fn extra_attributes<S: DeviceSource>(
        &self,
        coordinator: &Coordinator<S>,
    ) -> BTreeMap<&'static str, Value> {
        lookup(coordinator, &self.device_id)
            .map(|device| device_attributes(&device))
            .unwrap_or_default()
    }
}

fn opaque_value(code: &OpaqueCode) -> Value {
    match code {
        OpaqueCode::Int(n) => Value::from(*n),
        OpaqueCode::Text(s) => Value::from(s.as_str()),
    }
}

fn device_attributes(device: &Device) -> BTreeMap<&'static str, Value> {
    let mut attrs = BTreeMap::new();

    if let Some(mv) = device.battery_millivolts {
        attrs.insert("battery_voltage", Value::from(mv));
    }
    if let Some(ts) = device.last_contact_at {
        attrs.insert("last_contact", Value::from(ts.to_rfc3339()));
    }
    if let Some(pos) = &device.last_position {
        if let Some(ts) = pos.measured_at {
            attrs.insert("last_update", Value::from(ts.to_rfc3339()));
        }
        if let Some(sat) = pos.satellite_count {
            attrs.insert("satellites", Value::from(sat));
        }
        if let Some(rssi) = pos.signal_strength {
            attrs.insert("signal_strength", Value::from(rssi));
        }
    }
    if let Some(status) = &device.status {
        attrs.insert("status", opaque_value(status));
    }
    if let Some(mode) = &device.mode {
        attrs.insert("mode", opaque_value(mode));
    }
    if let Some(label) = device.charging_label() {
        attrs.insert("charging", Value::from(label));
    }
    if let Some(label) = device.tracking_mode_label() {
        attrs.insert("tracking_mode", Value::from(label));
    }
    if let Some(label) = device.live_tracking_label() {
        attrs.insert("live_tracking", Value::from(label));
    }

    attrs
}

// ── Construction ─────────────────────────────────────────────────

/// Entities for every collar in `snapshot`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub trackers: Vec<TrackerEntity>,
    pub sensors: Vec<SensorEntity>,
}

/// One tracker and one sensor per attribute for each device, in snapshot order.
pub fn build_entities(snapshot: &Snapshot) -> Entities {
    use strum::IntoEnumIterator;

    let mut entities = Entities::default();
    for device in snapshot.devices() {
        let name = device.display_name();
        entities
            .trackers
            .push(TrackerEntity::new(device.id.clone(), name.clone()));
        entities.sensors.extend(
            Attribute::iter().map(|attr| SensorEntity::new(device.id.clone(), name.clone(), attr)),
        );
    }
    entities
}
