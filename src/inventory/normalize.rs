//! Field Normalizer
//!
//! Rewrites the raw tokens reported by the inventory agent into display
//! values and fills the fields later stages rely on. Every mapping only
//! covers raw tokens, so normalizing twice is a no-op.

use crate::domain::attributes::{attr_bool, text, RawDevice};
use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

// =============================================================================
// Token Tables
// =============================================================================

/// Name tokens, replaced in order
pub const NAME_TOKENS: [(&str, &str); 3] = [
    ("bluetooth_device", "Bluetooth USB Host Controller"),
    ("hub_device", "USB Hub"),
    ("composite_device", "Composite Device"),
];

/// Speed tokens, replaced in order
pub const SPEED_TOKENS: [(&str, &str); 4] = [
    ("low_speed", "USB 1.0"),
    ("full_speed", "USB 1.1"),
    ("high_speed", "USB 2.0"),
    ("super_speed", "USB 3.x"),
];

/// Speed stored when the agent does not report one
pub const DEFAULT_DEVICE_SPEED: &str = "USB 1.1";

pub const APPLE_VENDOR_TOKEN: &str = "apple_vendor_id";
pub const APPLE_VENDOR_ID: &str = "0x05ac (Apple, Inc.)";

static VENDOR_MANUFACTURER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\((.*?)\)").expect("vendor manufacturer pattern"));

// =============================================================================
// Field Normalizer
// =============================================================================

/// Normalizes one raw device entry in place
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldNormalizer;

impl FieldNormalizer {
    /// Create a new normalizer
    pub fn new() -> Self {
        Self
    }

    /// Normalize one entry in place
    pub fn normalize(&self, device: &mut RawDevice) {
        if let Some(Value::String(name)) = device.get_mut("name") {
            *name = replace_tokens(name, &NAME_TOKENS);
        }

        match device.get_mut("device_speed") {
            Some(Value::String(speed)) => *speed = replace_tokens(speed, &SPEED_TOKENS),
            Some(_) => {}
            None => {
                device.insert("device_speed".into(), DEFAULT_DEVICE_SPEED.into());
            }
        }

        ensure_string(device, "manufacturer");
        ensure_string(device, "printer_id");

        for key in ["internal", "media"] {
            if let Some(value) = device.get_mut(key) {
                *value = Value::Bool(attr_bool(value));
            }
        }

        self.normalize_vendor(device);
    }

    fn normalize_vendor(&self, device: &mut RawDevice) {
        let Some(vendor) = device.get_mut("vendor_id") else {
            return;
        };

        if vendor.as_str() == Some(APPLE_VENDOR_TOKEN) {
            *vendor = APPLE_VENDOR_ID.into();
        }

        let vendor_id = text(device, "vendor_id").into_owned();
        if vendor_id.is_empty() || !text(device, "manufacturer").is_empty() {
            return;
        }

        match extract_manufacturer(&vendor_id) {
            Ok(manufacturer) => {
                device.insert("manufacturer".into(), manufacturer.into());
            }
            Err(e) => {
                warn!(name = %text(device, "name"), "{}; leaving manufacturer empty", e);
            }
        }
    }
}

/// Manufacturer name from the first parenthesized group of a vendor id,
/// e.g. `0x046d (Logitech Inc.)` yields `Logitech Inc.`
pub fn extract_manufacturer(vendor_id: &str) -> Result<String> {
    VENDOR_MANUFACTURER
        .captures(vendor_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::MalformedVendorId {
            vendor_id: vendor_id.to_string(),
        })
}

fn replace_tokens(value: &str, tokens: &[(&str, &str)]) -> String {
    tokens
        .iter()
        .fold(value.to_string(), |acc, &(from, to)| acc.replace(from, to))
}

fn ensure_string(device: &mut RawDevice, key: &str) {
    if !device.contains_key(key) {
        device.insert(key.to_string(), Value::String(String::new()));
    }
}
