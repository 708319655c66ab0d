//! Domain Ports - Core types and trait definitions for the inventory service
//!
//! These traits define the boundaries between the ingest pipeline and external
//! systems (record storage, configuration). Adapters implement these traits to
//! provide concrete functionality.

use crate::domain::attributes::{attr_bool, attr_i64, attr_string, RawDevice};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Device Types
// =============================================================================

/// Canonical device type taxonomy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Camera,
    #[serde(rename = "USB Hub")]
    UsbHub,
    Keyboard,
    #[serde(rename = "IR Receiver")]
    IrReceiver,
    #[serde(rename = "Bluetooth Controller")]
    BluetoothController,
    #[serde(rename = "iPhone")]
    IPhone,
    #[serde(rename = "iPad")]
    IPad,
    #[serde(rename = "iPod")]
    IPod,
    Mouse,
    #[serde(rename = "Mass Storage")]
    MassStorage,
    #[serde(rename = "Audio Device")]
    AudioDevice,
    Display,
    #[serde(rename = "Composite Device")]
    CompositeDevice,
    Network,
    #[serde(rename = "UPS")]
    Ups,
    #[serde(rename = "iBridge")]
    IBridge,
    Scanner,
    #[serde(rename = "Wacom Tablet")]
    WacomTablet,
    #[serde(rename = "Interactive Board")]
    InteractiveBoard,
    Printer,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl DeviceType {
    /// Every canonical type, in taxonomy order
    pub const ALL: [DeviceType; 21] = [
        DeviceType::Camera,
        DeviceType::UsbHub,
        DeviceType::Keyboard,
        DeviceType::IrReceiver,
        DeviceType::BluetoothController,
        DeviceType::IPhone,
        DeviceType::IPad,
        DeviceType::IPod,
        DeviceType::Mouse,
        DeviceType::MassStorage,
        DeviceType::AudioDevice,
        DeviceType::Display,
        DeviceType::CompositeDevice,
        DeviceType::Network,
        DeviceType::Ups,
        DeviceType::IBridge,
        DeviceType::Scanner,
        DeviceType::WacomTablet,
        DeviceType::InteractiveBoard,
        DeviceType::Printer,
        DeviceType::Unknown,
    ];

    /// Display label stored in the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Camera => "Camera",
            DeviceType::UsbHub => "USB Hub",
            DeviceType::Keyboard => "Keyboard",
            DeviceType::IrReceiver => "IR Receiver",
            DeviceType::BluetoothController => "Bluetooth Controller",
            DeviceType::IPhone => "iPhone",
            DeviceType::IPad => "iPad",
            DeviceType::IPod => "iPod",
            DeviceType::Mouse => "Mouse",
            DeviceType::MassStorage => "Mass Storage",
            DeviceType::AudioDevice => "Audio Device",
            DeviceType::Display => "Display",
            DeviceType::CompositeDevice => "Composite Device",
            DeviceType::Network => "Network",
            DeviceType::Ups => "UPS",
            DeviceType::IBridge => "iBridge",
            DeviceType::Scanner => "Scanner",
            DeviceType::WacomTablet => "Wacom Tablet",
            DeviceType::InteractiveBoard => "Interactive Board",
            DeviceType::Printer => "Printer",
            DeviceType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::error::Error::InvalidInput(format!("unknown device type: {}", s)))
    }
}

// =============================================================================
// Device Record
// =============================================================================

/// One attached USB peripheral as stored for a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Storage-assigned identity, `None` until inserted
    pub id: Option<u64>,
    /// Owner key: serial number of the reporting host
    pub serial_number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub manufacturer: String,
    pub vendor_id: String,
    pub device_speed: String,
    pub internal: bool,
    /// Removable media is present
    pub media: bool,
    pub bus_power: i64,
    pub bus_power_used: i64,
    pub extra_current_used: i64,
    /// The device's own serial number
    pub usb_serial_number: String,
    /// IEEE-1284 device id, only reported by printers
    pub printer_id: String,
}

impl DeviceRecord {
    /// Empty record template for an owner, every field at its zero value
    pub fn template(serial_number: impl Into<String>) -> Self {
        Self {
            id: None,
            serial_number: serial_number.into(),
            name: String::new(),
            device_type: DeviceType::Unknown,
            manufacturer: String::new(),
            vendor_id: String::new(),
            device_speed: String::new(),
            internal: false,
            media: false,
            bus_power: 0,
            bus_power_used: 0,
            extra_current_used: 0,
            usb_serial_number: String::new(),
            printer_id: String::new(),
        }
    }

    /// Overlay a device's attributes onto the template.
    ///
    /// Keys outside the template are ignored. The owner key and `id` are never
    /// taken from the attributes.
    pub fn from_attributes(serial_number: impl Into<String>, device: &RawDevice) -> Self {
        let mut record = Self::template(serial_number);

        let strings: [(&str, &mut String); 6] = [
            ("name", &mut record.name),
            ("manufacturer", &mut record.manufacturer),
            ("vendor_id", &mut record.vendor_id),
            ("device_speed", &mut record.device_speed),
            ("usb_serial_number", &mut record.usb_serial_number),
            ("printer_id", &mut record.printer_id),
        ];
        for (key, field) in strings {
            if let Some(value) = device.get(key).and_then(attr_string) {
                *field = value;
            }
        }

        if let Some(label) = device.get("type").and_then(attr_string) {
            record.device_type = label.parse().unwrap_or_default();
        }

        if let Some(value) = device.get("internal") {
            record.internal = attr_bool(value);
        }
        if let Some(value) = device.get("media") {
            record.media = attr_bool(value);
        }

        let numbers: [(&str, &mut i64); 3] = [
            ("bus_power", &mut record.bus_power),
            ("bus_power_used", &mut record.bus_power_used),
            ("extra_current_used", &mut record.extra_current_used),
        ];
        for (key, field) in numbers {
            if let Some(value) = device.get(key).and_then(attr_i64) {
                *field = value;
            }
        }

        record
    }
}

/// Outcome of replacing one owner's stored snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotReplacement {
    /// Records deleted from the previous snapshot
    pub removed: usize,
    /// Records inserted, with their assigned ids
    pub inserted: Vec<DeviceRecord>,
}

// =============================================================================
// Device Store Port
// =============================================================================

/// Port for device record persistence
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Delete every record owned by `serial_number`, returning the count
    async fn delete_where(&self, serial_number: &str) -> Result<usize>;

    /// Insert a record; the store assigns its id
    async fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord>;

    /// List every record owned by `serial_number`, in insertion order
    async fn list(&self, serial_number: &str) -> Result<Vec<DeviceRecord>>;

    /// Replace an owner's snapshot.
    ///
    /// The default deletes then inserts and is not transactional: a failure
    /// part way leaves a partial set. Stores with transactions should override.
    async fn replace_snapshot(
        &self,
        serial_number: &str,
        records: Vec<DeviceRecord>,
    ) -> Result<SnapshotReplacement> {
        let removed = self.delete_where(serial_number).await?;

        let mut inserted = Vec::with_capacity(records.len());
        for mut record in records {
            record.id = None;
            inserted.push(self.insert(record).await?);
        }

        Ok(SnapshotReplacement { removed, inserted })
    }

    /// Get backend name
    fn backend_name(&self) -> &str;
}

// =============================================================================
// Settings Port
// =============================================================================

/// Port for named configuration lookups
pub trait SettingsProvider: Send + Sync {
    /// Look up a boolean setting
    fn get_bool(&self, name: &str) -> Option<bool>;

    /// Look up a string setting
    fn get_string(&self, name: &str) -> Option<String>;

    /// Boolean setting with a fallback
    fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get_bool(name).unwrap_or(default)
    }
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type DeviceStoreRef = Arc<dyn DeviceStore>;
