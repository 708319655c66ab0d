//! Device Type Rules
//!
//! The ordered keyword table that maps a device name to its canonical type.
//! Order is significant: keyword sets overlap ("hub" vs "card reader hub"),
//! and the first matching rule wins.

use crate::domain::ports::DeviceType;
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Built-in rules, in evaluation order
pub const DEFAULT_RULES: [(DeviceType, &str); 19] = [
    (DeviceType::Camera, "isight|camera|video|facetime|webcam"),
    (DeviceType::UsbHub, "hub"),
    (DeviceType::Keyboard, "keyboard|keykoard|usb kb"),
    (DeviceType::IrReceiver, "ir receiver"),
    (DeviceType::BluetoothController, "bluetooth"),
    (DeviceType::IPhone, "iphone"),
    (DeviceType::IPad, "ipad"),
    (DeviceType::IPod, "ipod"),
    (DeviceType::Mouse, "mouse|ps2 orbit|trackpad"),
    (
        DeviceType::MassStorage,
        "card reader|os x install disk|apple usb superdrive|ultra fast media reader|usb to serial-ata bridge",
    ),
    (DeviceType::AudioDevice, "audio|sound|headset|microphone|akm"),
    (DeviceType::Display, "displaylink|display|monitor|touchscreen"),
    (DeviceType::CompositeDevice, "composite device"),
    (DeviceType::Network, "network|ethernet|modem|bcm"),
    (DeviceType::Ups, "ups"),
    (DeviceType::IBridge, "ibridge"),
    (DeviceType::Scanner, "scanner"),
    (DeviceType::WacomTablet, "wacom|ptz-|intuos|ctl-"),
    (DeviceType::InteractiveBoard, "smartboard|activboard"),
];

static DEFAULT_RULE_SET: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    DEFAULT_RULES
        .iter()
        .map(|&(device_type, pattern)| TypeRule::new(device_type, pattern))
        .map(|rule| rule.compile().expect("built-in device type rule"))
        .collect()
});

/// Compiled built-in rule table, shared process-wide
pub fn default_rules() -> &'static [CompiledRule] {
    &DEFAULT_RULE_SET
}

// =============================================================================
// Rule Definitions
// =============================================================================

/// A device type and the keyword alternation that selects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRule {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    /// Keyword alternation, e.g. `mouse|ps2 orbit|trackpad`
    pub pattern: String,
}

impl TypeRule {
    pub fn new(device_type: DeviceType, pattern: impl Into<String>) -> Self {
        Self {
            device_type,
            pattern: pattern.into(),
        }
    }

    /// Compile the pattern; matching is case-insensitive
    pub fn compile(&self) -> Result<CompiledRule> {
        let regex = Regex::new(&format!("(?i){}", self.pattern)).map_err(|e| {
            Error::InvalidRulePattern {
                device_type: self.device_type.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(CompiledRule {
            device_type: self.device_type,
            pattern: self.pattern.clone(),
            regex,
        })
    }
}

/// A rule ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub device_type: DeviceType,
    pub pattern: String,
    regex: Regex,
}

impl CompiledRule {
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Built-in rules as editable definitions
pub fn default_type_rules() -> Vec<TypeRule> {
    DEFAULT_RULES
        .iter()
        .map(|&(device_type, pattern)| TypeRule::new(device_type, pattern))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_rules_compile_in_order() {
        let rules = default_rules();
        assert_eq!(rules.len(), DEFAULT_RULES.len());
        assert_eq!(rules[0].device_type, DeviceType::Camera);
        assert_eq!(rules[1].device_type, DeviceType::UsbHub);
        assert_eq!(rules[18].device_type, DeviceType::InteractiveBoard);
    }

    #[test]
    fn test_rule_matching_is_case_insensitive() {
        let rule = TypeRule::new(DeviceType::Mouse, "mouse|ps2 orbit|trackpad")
            .compile()
            .unwrap();
        assert!(rule.matches("Magic Trackpad 2"));
        assert!(rule.matches("ps2 orbit"));
        assert!(!rule.matches("keyboard"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = TypeRule::new(DeviceType::Scanner, "scan(ner").compile().unwrap_err();
        assert_matches!(err, Error::InvalidRulePattern { device_type, .. } if device_type == "Scanner");
    }

    #[test]
    fn test_no_rule_targets_override_types() {
        for (device_type, _) in DEFAULT_RULES {
            assert_ne!(device_type, DeviceType::Printer);
            assert_ne!(device_type, DeviceType::Unknown);
        }
    }
}
