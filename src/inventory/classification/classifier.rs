//! Device Classifier
//!
//! Assigns each normalized USB device a canonical type: the first matching
//! name rule, then manufacturer, printer and media overrides.

use crate::domain::attributes::{flag, text, RawDevice};
use crate::domain::ports::DeviceType;
use crate::error::Result;
use crate::inventory::classification::rules::{
    default_rules, default_type_rules, CompiledRule, TypeRule,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

// =============================================================================
// Classification Result
// =============================================================================

/// What decided the final type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationReason {
    /// No rule matched, type left at `unknown`
    NoMatch,
    /// A name rule matched
    NameRule,
    /// Manufacturer is a DisplayLink adapter
    DisplayManufacturer,
    /// Device reported an IEEE-1284 id
    PrinterId,
    /// Removable media is present
    MediaPresent,
}

impl std::fmt::Display for ClassificationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationReason::NoMatch => write!(f, "no_match"),
            ClassificationReason::NameRule => write!(f, "name_rule"),
            ClassificationReason::DisplayManufacturer => write!(f, "display_manufacturer"),
            ClassificationReason::PrinterId => write!(f, "printer_id"),
            ClassificationReason::MediaPresent => write!(f, "media_present"),
        }
    }
}

/// Classification result for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub device_type: DeviceType,
    /// Type chosen by the name rules alone, before overrides
    pub name_match: Option<DeviceType>,
    pub reason: ClassificationReason,
    /// Name marks the device as internal
    pub force_internal: bool,
}

// =============================================================================
// Classifier Configuration
// =============================================================================

/// Configuration for the device classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Name rules, evaluated in order
    pub rules: Vec<TypeRule>,
    /// Manufacturer substring that forces `Display` (case-insensitive)
    pub display_manufacturer: String,
    /// Name substring that forces `internal` (case-insensitive)
    pub internal_marker: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_type_rules(),
            display_manufacturer: "DisplayLink".to_string(),
            internal_marker: "Internal".to_string(),
        }
    }
}

// =============================================================================
// Device Classifier
// =============================================================================

/// Classifies USB devices into canonical types
#[derive(Debug, Clone)]
pub struct DeviceClassifier {
    rules: Cow<'static, [CompiledRule]>,
    display_manufacturer: String,
    internal_marker: String,
}

impl DeviceClassifier {
    /// Create a new classifier with the built-in rules
    pub fn new() -> Self {
        let config = ClassifierConfig::default();
        Self {
            rules: Cow::Borrowed(default_rules()),
            display_manufacturer: config.display_manufacturer.to_lowercase(),
            internal_marker: config.internal_marker.to_lowercase(),
        }
    }

    /// Create a classifier with custom config
    pub fn with_config(config: ClassifierConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(TypeRule::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules: Cow::Owned(rules),
            display_manufacturer: config.display_manufacturer.to_lowercase(),
            internal_marker: config.internal_marker.to_lowercase(),
        })
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Type of the first rule matching a device name
    pub fn classify_name(&self, name: &str) -> Option<DeviceType> {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&name))
            .map(|rule| rule.device_type)
    }

    /// Classify a normalized device without modifying it
    pub fn classify(&self, device: &RawDevice) -> Classification {
        let name = text(device, "name");
        let name_match = self.classify_name(&name);

        let (mut device_type, mut reason) = match name_match {
            Some(device_type) => (device_type, ClassificationReason::NameRule),
            None => (DeviceType::Unknown, ClassificationReason::NoMatch),
        };

        if !self.display_manufacturer.is_empty()
            && text(device, "manufacturer")
                .to_lowercase()
                .contains(&self.display_manufacturer)
        {
            device_type = DeviceType::Display;
            reason = ClassificationReason::DisplayManufacturer;
        } else if !text(device, "printer_id").is_empty() {
            device_type = DeviceType::Printer;
            reason = ClassificationReason::PrinterId;
        }

        if flag(device, "media") {
            device_type = DeviceType::MassStorage;
            reason = ClassificationReason::MediaPresent;
        }

        let force_internal = !self.internal_marker.is_empty()
            && name.to_lowercase().contains(&self.internal_marker);

        Classification {
            device_type,
            name_match,
            reason,
            force_internal,
        }
    }

    /// Classify a device and record the result on it
    pub fn apply(&self, device: &mut RawDevice) -> Classification {
        let classification = self.classify(device);

        debug!(
            name = %text(device, "name"),
            device_type = %classification.device_type,
            reason = %classification.reason,
            "Classified USB device"
        );

        device.insert(
            "type".to_string(),
            Value::String(classification.device_type.to_string()),
        );
        if classification.force_internal {
            device.insert("internal".to_string(), Value::Bool(true));
        }

        classification
    }
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDevice {
        value.as_object().cloned().unwrap()
    }

    fn type_of(value: serde_json::Value) -> DeviceType {
        DeviceClassifier::new().classify(&raw(value)).device_type
    }

    #[test]
    fn test_name_rules() {
        let classifier = DeviceClassifier::new();
        let cases = [
            ("FaceTime HD Camera (Built-in)", DeviceType::Camera),
            ("USB2.0 Hub", DeviceType::UsbHub),
            ("Apple Keyboard", DeviceType::Keyboard),
            ("IR Receiver", DeviceType::IrReceiver),
            ("Bluetooth USB Host Controller", DeviceType::BluetoothController),
            ("iPhone", DeviceType::IPhone),
            ("iPad", DeviceType::IPad),
            ("iPod", DeviceType::IPod),
            ("USB Optical Mouse", DeviceType::Mouse),
            ("Built-in SD Card Reader", DeviceType::MassStorage),
            ("USB Audio CODEC", DeviceType::AudioDevice),
            ("LG UltraFine Display", DeviceType::Display),
            ("Composite Device", DeviceType::CompositeDevice),
            ("USB 10/100/1000 LAN Ethernet", DeviceType::Network),
            ("Back-UPS ES 700", DeviceType::Ups),
            ("iBridge", DeviceType::IBridge),
            ("CanoScan Scanner", DeviceType::Scanner),
            ("Intuos PT M", DeviceType::WacomTablet),
            ("SMARTBoard 800", DeviceType::InteractiveBoard),
        ];

        for (name, expected) in cases {
            assert_eq!(classifier.classify_name(name), Some(expected), "{}", name);
        }
        assert_eq!(classifier.classify_name("Generic Thing"), None);
    }

    #[test]
    fn test_unknown_default() {
        let classification = DeviceClassifier::new().classify(&raw(json!({ "name": "Gizmo" })));
        assert_eq!(classification.device_type, DeviceType::Unknown);
        assert_eq!(classification.reason, ClassificationReason::NoMatch);
        assert_eq!(classification.name_match, None);
    }

    #[test]
    fn test_first_rule_wins() {
        // "card reader" is Mass Storage, but "hub" comes first
        assert_eq!(type_of(json!({ "name": "USB Card Reader Hub" })), DeviceType::UsbHub);
        // "video" (Camera) precedes "display"
        assert_eq!(type_of(json!({ "name": "Video Display Adapter" })), DeviceType::Camera);
    }

    #[test]
    fn test_display_manufacturer_override() {
        let classification = DeviceClassifier::new().classify(&raw(json!({
            "name": "USB Keyboard",
            "manufacturer": "displaylink corp.",
        })));
        assert_eq!(classification.device_type, DeviceType::Display);
        assert_eq!(classification.name_match, Some(DeviceType::Keyboard));
        assert_eq!(classification.reason, ClassificationReason::DisplayManufacturer);
    }

    #[test]
    fn test_printer_override() {
        assert_eq!(
            type_of(json!({
                "name": "HP LaserJet",
                "printer_id": "MFG:HP;MDL:LaserJet;CMD:PCL;",
            })),
            DeviceType::Printer
        );
    }

    #[test]
    fn test_display_manufacturer_beats_printer_id() {
        assert_eq!(
            type_of(json!({
                "name": "Dock",
                "manufacturer": "DisplayLink",
                "printer_id": "MFG:DisplayLink;",
            })),
            DeviceType::Display
        );
    }

    #[test]
    fn test_media_beats_everything() {
        assert_eq!(
            type_of(json!({ "name": "USB Keyboard", "media": true })),
            DeviceType::MassStorage
        );
        assert_eq!(
            type_of(json!({
                "name": "Printer",
                "manufacturer": "DisplayLink",
                "printer_id": "MFG:X;",
                "media": 1,
            })),
            DeviceType::MassStorage
        );
    }

    #[test]
    fn test_internal_marker() {
        let classifier = DeviceClassifier::new();
        let mut device = raw(json!({ "name": "Apple Internal Keyboard / Trackpad", "internal": false }));

        let classification = classifier.apply(&mut device);

        assert!(classification.force_internal);
        assert_eq!(classification.device_type, DeviceType::Keyboard);
        assert_eq!(device["internal"], json!(true));
        assert_eq!(device["type"], json!("Keyboard"));

        let mut external = raw(json!({ "name": "USB Keyboard", "internal": false }));
        classifier.apply(&mut external);
        assert_eq!(external["internal"], json!(false));
    }

    #[test]
    fn test_deterministic() {
        let classifier = DeviceClassifier::new();
        let device = raw(json!({ "name": "Magic Mouse", "manufacturer": "Apple Inc." }));
        let first = classifier.classify(&device);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&device), first);
        }
    }

    #[test]
    fn test_custom_rule_order() {
        let config = ClassifierConfig {
            rules: vec![
                TypeRule::new(DeviceType::MassStorage, "card reader"),
                TypeRule::new(DeviceType::UsbHub, "hub"),
            ],
            ..Default::default()
        };
        let classifier = DeviceClassifier::with_config(config).unwrap();

        assert_eq!(
            classifier.classify_name("USB Card Reader Hub"),
            Some(DeviceType::MassStorage)
        );
        assert_eq!(classifier.rules().len(), 2);
    }

    #[test]
    fn test_invalid_custom_rule() {
        let config = ClassifierConfig {
            rules: vec![TypeRule::new(DeviceType::Mouse, "(mouse")],
            ..Default::default()
        };
        assert!(DeviceClassifier::with_config(config).is_err());
    }
}
