// ── Domain model ──
//
// Canonical, normalized collar state. Built from `pettracer_api` wire
// types by `crate::convert`; never constructed from raw JSON directly.

pub mod device;
pub mod device_id;

pub use device::{ChargingState, Device, Position, TrackingMode, battery_percent};
pub use device_id::DeviceId;
pub use pettracer_api::OpaqueCode;
