// ── Snapshot storage and observer fan-out ──

mod observers;
mod snapshot;

pub use observers::{CycleUpdate, Observer, SubscriptionHandle};
pub(crate) use observers::ObserverSet;
pub use snapshot::Snapshot;
