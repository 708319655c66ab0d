//! Snapshot Writer
//!
//! Replaces everything stored for a host with the newly classified device
//! set. Records are built from the fixed template, so unknown keys are
//! dropped and absent fields keep their zero values.

use crate::domain::attributes::RawDevice;
use crate::domain::ports::{DeviceRecord, DeviceStoreRef, SnapshotReplacement};
use crate::error::Result;
use tracing::debug;

/// Writes per-host device snapshots through a [`DeviceStore`](crate::domain::DeviceStore)
#[derive(Clone)]
pub struct SnapshotWriter {
    store: DeviceStoreRef,
}

impl SnapshotWriter {
    /// Create a new writer over a store
    pub fn new(store: DeviceStoreRef) -> Self {
        Self { store }
    }

    /// Backing store
    pub fn store(&self) -> &DeviceStoreRef {
        &self.store
    }

    /// Build storable records for an owner, ids left unassigned
    pub fn build_records(serial_number: &str, devices: &[RawDevice]) -> Vec<DeviceRecord> {
        devices
            .iter()
            .map(|device| DeviceRecord::from_attributes(serial_number, device))
            .collect()
    }

    /// Delete the owner's previous snapshot and insert the new one
    pub async fn replace(
        &self,
        serial_number: &str,
        devices: &[RawDevice],
    ) -> Result<SnapshotReplacement> {
        let records = Self::build_records(serial_number, devices);

        let replacement = self.store.replace_snapshot(serial_number, records).await?;

        debug!(
            serial_number,
            backend = self.store.backend_name(),
            removed = replacement.removed,
            inserted = replacement.inserted.len(),
            "Replaced USB snapshot"
        );

        Ok(replacement)
    }
}

impl std::fmt::Debug for SnapshotWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotWriter")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{DeviceStore, DeviceType};
    use crate::storage::MemoryDeviceStore;
    use serde_json::json;
    use std::sync::Arc;

    fn raw(value: serde_json::Value) -> RawDevice {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_records_drops_unknown_fields() {
        let devices = vec![raw(json!({
            "name": "USB Hub",
            "type": "USB Hub",
            "location_id": "0x14100000",
            "bcd_device": 1.0,
        }))];

        let records = SnapshotWriter::build_records("S1", &devices);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].serial_number, "S1");
        assert_eq!(records[0].device_type, DeviceType::UsbHub);
        assert_eq!(records[0].id, None);
        let value = serde_json::to_value(&records[0]).unwrap();
        assert!(value.get("location_id").is_none());
    }

    #[tokio::test]
    async fn test_replace_removes_previous_snapshot() {
        let store = Arc::new(MemoryDeviceStore::new());
        let writer = SnapshotWriter::new(store.clone());

        writer
            .replace("S1", &[raw(json!({ "name": "A" })), raw(json!({ "name": "B" }))])
            .await
            .unwrap();
        writer.replace("S2", &[raw(json!({ "name": "Other" }))]).await.unwrap();

        let replacement = writer.replace("S1", &[raw(json!({ "name": "C" }))]).await.unwrap();

        assert_eq!(replacement.removed, 2);
        assert_eq!(replacement.inserted.len(), 1);
        assert!(replacement.inserted[0].id.is_some());

        let names: Vec<_> = store
            .list("S1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["C"]);
        assert_eq!(store.list("S2").await.unwrap().len(), 1);
    }
}
