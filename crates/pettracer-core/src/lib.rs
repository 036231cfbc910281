//! Polling core between a petTracer [`DeviceSource`] and host entities.
//!
//! - **[`Coordinator`]**: Owns the refresh schedule for one account.
//!   [`refresh_now()`](Coordinator::refresh_now) runs a single-flight
//!   fetch-and-normalize cycle; [`start()`](Coordinator::start) polls on a
//!   fixed interval until [`stop()`](Coordinator::stop) or an auth failure.
//!
//! - **[`Snapshot`]**: Immutable id-keyed view of every collar as of the last
//!   successful fetch, replaced wholesale each cycle. Built by [`normalize`].
//!
//! - **[`Observer`]** / **[`UpdateStream`]**: Notified once per completed
//!   cycle with a [`CycleUpdate`] carrying the snapshot and any failure.
//!
//! - **[`Attribute`]** and the reference [`entity`] types: Derived values
//!   (battery percentage, mode labels) computed the same way everywhere.
//!
//! - **[`Registry`]** and [`setup`]: Account lifecycle (validate, load,
//!   unload), with failures classified into "re-auth" vs "retry later".

pub mod attribute;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod registry;
pub mod setup;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use attribute::{Attribute, AttributeValue};
pub use config::{CoordinatorConfig, Credentials};
pub use convert::normalize;
pub use coordinator::{Coordinator, CoordinatorState, StopReason};
pub use entity::{DeviceInfo, Entities, SensorEntity, TrackerEntity, build_entities};
pub use error::{CoreError, FailureKind, ReasonCode, SetupError, UpdateFailure};
pub use registry::{AccountId, Registry};
pub use setup::{AccountInfo, setup_account, unload_account, validate_credentials};
pub use store::{CycleUpdate, Observer, Snapshot, SubscriptionHandle};
pub use stream::UpdateStream;

pub use model::{ChargingState, Device, DeviceId, Position, TrackingMode, battery_percent};

pub use pettracer_api::{DeviceSource, RawDevice};
