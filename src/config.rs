//! Service Settings
//!
//! Settings are read from an optional YAML file. Besides the typed keys,
//! any other top-level key is kept and exposed by name through
//! [`SettingsProvider`].

use crate::domain::ports::SettingsProvider;
use crate::error::{Error, Result};
use crate::inventory::filter::USB_INTERNAL_SETTING;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Service settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keep devices the host reports as internal
    pub usb_internal: bool,
    /// Directory for the file store; in-memory when unset
    pub data_dir: Option<PathBuf>,
    /// REST API bind address
    pub api_addr: Option<String>,
    /// Any other named settings
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Settings {
    /// Parse settings from YAML text; an empty document yields defaults
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load settings from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    /// Load settings from a file if given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

impl SettingsProvider for Settings {
    fn get_bool(&self, name: &str) -> Option<bool> {
        if name == USB_INTERNAL_SETTING {
            return Some(self.usb_internal);
        }

        match self.extra.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_string(&self, name: &str) -> Option<String> {
        match name {
            USB_INTERNAL_SETTING => return Some(self.usb_internal.to_string()),
            "api_addr" => return self.api_addr.clone(),
            "data_dir" => return self.data_dir.as_ref().map(|p| p.display().to_string()),
            _ => {}
        }

        match self.extra.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
