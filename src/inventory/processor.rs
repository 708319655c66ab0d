//! Inventory Processor
//!
//! Runs one host's USB payload through filtering, normalization and
//! classification, then replaces the host's stored snapshot.

use crate::domain::attributes::RawDevice;
use crate::domain::ports::{DeviceRecord, DeviceStoreRef, DeviceType, SettingsProvider};
use crate::error::{Error, Result};
use crate::inventory::classification::DeviceClassifier;
use crate::inventory::filter::{DropReason, EntryFilter};
use crate::inventory::normalize::FieldNormalizer;
use crate::inventory::snapshot::SnapshotWriter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

// =============================================================================
// Process Summary
// =============================================================================

/// What happened to one payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub serial_number: String,
    /// Entries in the payload
    pub received: usize,
    /// Records written for the host
    pub stored: usize,
    /// Records removed from the previous snapshot
    pub removed: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    pub types: BTreeMap<DeviceType, usize>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessSummary {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Devices ready to be stored, plus what was filtered out
#[derive(Debug, Clone, Default)]
pub struct PreparedPayload {
    pub devices: Vec<RawDevice>,
    pub dropped: BTreeMap<DropReason, usize>,
    pub types: BTreeMap<DeviceType, usize>,
}

// =============================================================================
// Inventory Processor
// =============================================================================

/// Filters, normalizes, classifies and stores USB payloads
#[derive(Debug, Clone)]
pub struct InventoryProcessor {
    filter: EntryFilter,
    normalizer: FieldNormalizer,
    classifier: DeviceClassifier,
    writer: SnapshotWriter,
}

impl InventoryProcessor {
    /// Create a processor with the built-in classifier rules
    pub fn new(store: DeviceStoreRef, settings: &dyn SettingsProvider) -> Self {
        Self::with_parts(
            EntryFilter::from_settings(settings),
            DeviceClassifier::new(),
            store,
        )
    }

    pub fn with_parts(
        filter: EntryFilter,
        classifier: DeviceClassifier,
        store: DeviceStoreRef,
    ) -> Self {
        Self {
            filter,
            normalizer: FieldNormalizer::new(),
            classifier,
            writer: SnapshotWriter::new(store),
        }
    }

    /// Filter, normalize and classify without touching storage
    pub fn prepare(&self, devices: Vec<RawDevice>) -> PreparedPayload {
        let outcome = self.filter.apply(devices);

        let mut prepared = PreparedPayload {
            devices: Vec::with_capacity(outcome.kept.len()),
            dropped: outcome.dropped,
            types: BTreeMap::new(),
        };

        for mut device in outcome.kept {
            self.normalizer.normalize(&mut device);
            let classification = self.classifier.apply(&mut device);
            *prepared.types.entry(classification.device_type).or_insert(0) += 1;
            prepared.devices.push(device);
        }

        prepared
    }

    /// Process one payload for a host, replacing its stored snapshot.
    ///
    /// A missing payload or owner key fails before anything is deleted. An
    /// empty payload clears the snapshot.
    pub async fn process(
        &self,
        serial_number: &str,
        payload: Option<Vec<RawDevice>>,
    ) -> Result<ProcessSummary> {
        let Some(devices) = payload else {
            return Err(Error::InvalidInput("no USB inventory payload supplied".into()));
        };
        if serial_number.trim().is_empty() {
            return Err(Error::InvalidInput("serial number is empty".into()));
        }

        let received = devices.len();
        let prepared = self.prepare(devices);
        let replacement = self.writer.replace(serial_number, &prepared.devices).await?;

        let summary = ProcessSummary {
            serial_number: serial_number.to_string(),
            received,
            stored: replacement.inserted.len(),
            removed: replacement.removed,
            dropped: prepared.dropped,
            types: prepared.types,
            processed_at: Utc::now(),
        };

        info!(
            serial_number,
            received = summary.received,
            stored = summary.stored,
            dropped = summary.dropped_total(),
            removed = summary.removed,
            "Processed USB inventory"
        );

        Ok(summary)
    }

    /// Records currently stored for a host
    pub async fn snapshot(&self, serial_number: &str) -> Result<Vec<DeviceRecord>> {
        self.writer.store().list(serial_number).await
    }

    /// Name of the backing store
    pub fn backend_name(&self) -> &str {
        self.writer.store().backend_name()
    }
}

/// Parse a JSON request body into device entries.
///
/// An empty body means no payload. Anything other than an array of objects is
/// rejected.
pub fn parse_payload(body: &[u8]) -> Result<Option<Vec<RawDevice>>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(entries) = value else {
        return Err(Error::InvalidInput("payload must be a JSON array of devices".into()));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(device) => Ok(device),
            _ => Err(Error::InvalidInput(format!(
                "payload entry {} is not an object",
                index
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::ports::DeviceStore;
    use crate::storage::MemoryDeviceStore;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn raw(value: serde_json::Value) -> RawDevice {
        value.as_object().cloned().unwrap()
    }

    fn processor() -> (InventoryProcessor, Arc<MemoryDeviceStore>) {
        let store = Arc::new(MemoryDeviceStore::new());
        let processor = InventoryProcessor::new(store.clone(), &Settings::default());
        (processor, store)
    }

    #[tokio::test]
    async fn test_end_to_end_bluetooth() {
        let (processor, store) = processor();

        let summary = processor
            .process(
                "C02XK0AAJG5J",
                Some(vec![raw(json!({ "name": "bluetooth_device", "internal": 0, "media": 0 }))]),
            )
            .await
            .unwrap();

        assert_eq!(summary.received, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.types[&DeviceType::BluetoothController], 1);

        let records = store.list("C02XK0AAJG5J").await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "Bluetooth USB Host Controller");
        assert_eq!(record.device_type, DeviceType::BluetoothController);
        assert_eq!(record.device_speed, "USB 1.1");
        assert!(!record.internal);
        assert!(!record.media);
        assert_eq!(record.manufacturer, "");
        assert_eq!(record.printer_id, "");
    }

    #[tokio::test]
    async fn test_full_replace() {
        let (processor, store) = processor();

        processor
            .process(
                "S1",
                Some(vec![
                    raw(json!({ "name": "USB Optical Mouse" })),
                    raw(json!({ "name": "USB Keyboard" })),
                ]),
            )
            .await
            .unwrap();

        let summary = processor
            .process("S1", Some(vec![raw(json!({ "name": "hub_device" }))]))
            .await
            .unwrap();
        assert_eq!(summary.removed, 2);

        let records = store.list("S1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "USB Hub");
        assert_eq!(records[0].device_type, DeviceType::UsbHub);
    }

    #[tokio::test]
    async fn test_missing_payload_keeps_snapshot() {
        let (processor, store) = processor();
        processor
            .process("S1", Some(vec![raw(json!({ "name": "USB Keyboard" }))]))
            .await
            .unwrap();

        let err = processor.process("S1", None).await.unwrap_err();
        assert_matches!(err, Error::InvalidInput(_));
        assert_eq!(store.list("S1").await.unwrap().len(), 1);

        let err = processor
            .process("  ", Some(vec![raw(json!({ "name": "USB Keyboard" }))]))
            .await
            .unwrap_err();
        assert_matches!(err, Error::InvalidInput(_));
    }

    #[tokio::test]
    async fn test_empty_payload_clears_snapshot() {
        let (processor, store) = processor();
        processor
            .process("S1", Some(vec![raw(json!({ "name": "USB Keyboard" }))]))
            .await
            .unwrap();

        let summary = processor.process("S1", Some(Vec::new())).await.unwrap();

        assert_eq!(summary.stored, 0);
        assert_eq!(summary.removed, 1);
        assert!(store.list("S1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_excluded_entries_never_stored() {
        let (processor, store) = processor();

        let summary = processor
            .process(
                "S1",
                Some(vec![
                    raw(json!({ "name": "XHCI Root Hub Simulation" })),
                    raw(json!({ "name": "USB31Bus" })),
                    raw(json!({ "name": "Apple Internal Keyboard / Trackpad", "internal": 1 })),
                    raw(json!({ "vendor_id": "0x1234" })),
                    raw(json!({ "name": "Magic Mouse" })),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(summary.received, 5);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.dropped_total(), 4);

        let records = store.list("S1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Magic Mouse");
    }

    #[tokio::test]
    async fn test_internal_devices_opt_in() {
        let store = Arc::new(MemoryDeviceStore::new());
        let settings = Settings {
            usb_internal: true,
            ..Default::default()
        };
        let processor = InventoryProcessor::new(store.clone(), &settings);

        processor
            .process(
                "S1",
                Some(vec![raw(json!({ "name": "Apple Internal Keyboard / Trackpad", "internal": 0 }))]),
            )
            .await
            .unwrap();

        let records = store.list("S1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].internal);
        assert_eq!(records[0].device_type, DeviceType::Keyboard);
    }

    #[tokio::test]
    async fn test_vendor_handling() {
        let (processor, _store) = processor();

        processor
            .process(
                "S1",
                Some(vec![
                    raw(json!({ "name": "Magic Keyboard", "vendor_id": "apple_vendor_id" })),
                    raw(json!({ "name": "Dongle", "vendor_id": "0xdead" })),
                ]),
            )
            .await
            .unwrap();

        let records = processor.snapshot("S1").await.unwrap();
        assert_eq!(records[0].vendor_id, "0x05ac (Apple, Inc.)");
        assert_eq!(records[0].manufacturer, "Apple, Inc.");
        assert_eq!(records[1].vendor_id, "0xdead");
        assert_eq!(records[1].manufacturer, "");
    }

    #[tokio::test]
    async fn test_media_and_printer_precedence() {
        let (processor, _store) = processor();

        processor
            .process(
                "S1",
                Some(vec![
                    raw(json!({ "name": "USB Keyboard", "media": 1 })),
                    raw(json!({
                        "name": "Dock",
                        "manufacturer": "DisplayLink",
                        "printer_id": "MFG:DL;",
                    })),
                    raw(json!({ "name": "LaserJet", "printer_id": "MFG:HP;" })),
                ]),
            )
            .await
            .unwrap();

        let types: Vec<_> = processor
            .snapshot("S1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.device_type)
            .collect();
        assert_eq!(
            types,
            vec![DeviceType::MassStorage, DeviceType::Display, DeviceType::Printer]
        );
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let (processor, _store) = processor();
        let payload = vec![
            raw(json!({ "name": "USB Card Reader Hub", "device_speed": "high_speed" })),
            raw(json!({ "name": "composite_device", "vendor_id": "0x0a5c (Broadcom Corp.)" })),
        ];

        let first = processor.prepare(payload.clone());
        let second = processor.prepare(payload);

        assert_eq!(first.devices, second.devices);
        assert_eq!(first.devices[0]["type"], json!("USB Hub"));
        assert_eq!(first.devices[0]["device_speed"], json!("USB 2.0"));
        assert_eq!(first.devices[1]["type"], json!("Composite Device"));
        assert_eq!(first.devices[1]["manufacturer"], json!("Broadcom Corp."));
    }

    #[test]
    fn test_parse_payload() {
        assert!(parse_payload(b"").unwrap().is_none());
        assert!(parse_payload(b"  \n").unwrap().is_none());

        let devices = parse_payload(br#"[{"name": "Hub"}, {"name": "Mouse"}]"#)
            .unwrap()
            .unwrap();
        assert_eq!(devices.len(), 2);

        assert_matches!(parse_payload(br#"{"name": "Hub"}"#), Err(Error::InvalidInput(_)));
        assert_matches!(parse_payload(br#"[{"name": "Hub"}, 3]"#), Err(Error::InvalidInput(_)));
        assert_matches!(parse_payload(b"[{"), Err(Error::JsonParse(_)));
    }
}
