// pettracer-api: wire model and client contract for the petTracer cloud API.
//
// This crate carries no HTTP code of its own. Implementations of
// `DeviceSource` own the network session; `pettracer-core` only ever
// talks to them through the trait.

pub mod error;
pub mod models;
pub mod source;

pub use error::Error;
pub use models::{
    EPOCH_MILLIS_THRESHOLD, OpaqueCode, RawDetails, RawDevice, RawPosition, RawTimestamp,
};
pub use source::DeviceSource;
