// ── Keyed device snapshot ──
//
// World state as of the last successful fetch. Immutable once built:
// the coordinator swaps whole snapshots, it never edits one in place.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{Device, DeviceId};

/// Mapping from collar id to normalized device.
///
/// Iteration follows the order devices arrived in the fetch result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    devices: IndexMap<DeviceId, Arc<Device>>,
}

impl Snapshot {
    /// The snapshot before any cycle has completed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(devices: IndexMap<DeviceId, Arc<Device>>) -> Self {
        Self { devices }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.keys()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &Arc<Device>)> {
        self.devices.iter()
    }
}

impl FromIterator<Device> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self {
            devices: iter
                .into_iter()
                .map(|d| (d.id.clone(), Arc::new(d)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_devices() {
        let snap = Snapshot::empty();
        assert!(snap.is_empty());
        assert_eq!(snap.len(), 0);
        assert!(snap.get("A").is_none());
    }

    #[test]
    fn lookup_by_str() {
        let snap: Snapshot = [Device::new("A"), Device::new("B")].into_iter().collect();
        assert!(snap.contains("A"));
        assert!(!snap.contains("C"));
        assert_eq!(snap.get("B").map(|d| d.id.as_str()), Some("B"));
    }
}
