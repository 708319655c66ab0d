//! Ingest Metrics
//!
//! Prometheus counters for processed payloads, kept in a registry owned by
//! the service rather than the process-wide default.

use crate::error::{Error, Result};
use crate::inventory::processor::ProcessSummary;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the ingest pipeline
pub struct IngestMetrics {
    registry: Registry,
    payloads: IntCounter,
    devices_stored: IntCounter,
    devices_dropped: IntCounterVec,
    devices_by_type: IntCounterVec,
    payload_errors: IntCounter,
    last_payload_at: RwLock<Option<DateTime<Utc>>>,
}

impl IngestMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let payloads = IntCounter::new(
            "usb_inventory_payloads_total",
            "Total number of USB payloads processed",
        )?;
        let devices_stored = IntCounter::new(
            "usb_inventory_devices_stored_total",
            "Total number of device records stored",
        )?;
        let devices_dropped = IntCounterVec::new(
            Opts::new(
                "usb_inventory_devices_dropped_total",
                "Devices dropped by the entry filter",
            ),
            &["reason"],
        )?;
        let devices_by_type = IntCounterVec::new(
            Opts::new(
                "usb_inventory_devices_by_type_total",
                "Stored devices by classified type",
            ),
            &["type"],
        )?;
        let payload_errors = IntCounter::new(
            "usb_inventory_payload_errors_total",
            "Payloads rejected or failed during processing",
        )?;

        registry.register(Box::new(payloads.clone()))?;
        registry.register(Box::new(devices_stored.clone()))?;
        registry.register(Box::new(devices_dropped.clone()))?;
        registry.register(Box::new(devices_by_type.clone()))?;
        registry.register(Box::new(payload_errors.clone()))?;

        Ok(Self {
            registry,
            payloads,
            devices_stored,
            devices_dropped,
            devices_by_type,
            payload_errors,
            last_payload_at: RwLock::new(None),
        })
    }

    /// Count a successfully processed payload
    pub fn record(&self, summary: &ProcessSummary) {
        self.payloads.inc();
        self.devices_stored.inc_by(summary.stored as u64);

        for (reason, count) in &summary.dropped {
            self.devices_dropped
                .with_label_values(&[reason.as_str()])
                .inc_by(*count as u64);
        }
        for (device_type, count) in &summary.types {
            self.devices_by_type
                .with_label_values(&[device_type.as_str()])
                .inc_by(*count as u64);
        }

        *self.last_payload_at.write() = Some(summary.processed_at);
    }

    /// Count a rejected or failed payload
    pub fn record_error(&self) {
        self.payload_errors.inc();
    }

    pub fn payloads_total(&self) -> u64 {
        self.payloads.get()
    }

    pub fn errors_total(&self) -> u64 {
        self.payload_errors.get()
    }

    /// When the last payload was processed
    pub fn last_payload_at(&self) -> Option<DateTime<Utc>> {
        *self.last_payload_at.read()
    }

    /// Prometheus text exposition
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("metrics are not valid UTF-8: {}", e)))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl std::fmt::Debug for IngestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestMetrics")
            .field("payloads", &self.payloads.get())
            .field("payload_errors", &self.payload_errors.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::DeviceType;
    use crate::inventory::filter::DropReason;
    use std::collections::BTreeMap;

    fn summary() -> ProcessSummary {
        ProcessSummary {
            serial_number: "C02XYZ".into(),
            received: 5,
            stored: 3,
            removed: 0,
            dropped: BTreeMap::from([(DropReason::SimulatedHub, 2)]),
            types: BTreeMap::from([(DeviceType::Keyboard, 2), (DeviceType::Mouse, 1)]),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_summary() {
        let metrics = IngestMetrics::new().unwrap();
        assert_eq!(metrics.last_payload_at(), None);

        let summary = summary();
        metrics.record(&summary);
        metrics.record(&summary);
        metrics.record_error();

        assert_eq!(metrics.payloads_total(), 2);
        assert_eq!(metrics.errors_total(), 1);
        assert_eq!(metrics.last_payload_at(), Some(summary.processed_at));
    }

    #[test]
    fn test_render() {
        let metrics = IngestMetrics::new().unwrap();
        metrics.record(&summary());

        let text = metrics.render().unwrap();
        assert!(text.contains("usb_inventory_payloads_total 1"));
        assert!(text.contains("usb_inventory_devices_stored_total 3"));
        assert!(text.contains(r#"usb_inventory_devices_dropped_total{reason="simulated_hub"} 2"#));
        assert!(text.contains(r#"usb_inventory_devices_by_type_total{type="Keyboard"} 2"#));
        assert!(text.contains("usb_inventory_payload_errors_total 0"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = IngestMetrics::new().unwrap();
        let b = IngestMetrics::new().unwrap();
        a.record_error();
        assert_eq!(b.errors_total(), 0);
    }
}
