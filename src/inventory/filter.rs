//! Entry Filter
//!
//! Drops inventory entries that are not discrete USB devices: nameless
//! entries, bus controllers, simulated root hubs and, unless enabled,
//! internal devices.

use crate::domain::attributes::{flag, text, RawDevice};
use crate::domain::ports::SettingsProvider;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Setting that opts internal devices into the inventory
pub const USB_INTERNAL_SETTING: &str = "usb_internal";

/// Simulated hub devices reported by the host controller drivers
pub const SIMULATED_HUBS: [&str; 7] = [
    "OHCI Root Hub Simulation",
    "UHCI Root Hub Simulation",
    "EHCI Root Hub Simulation",
    "RHCI Root Hub Simulation",
    "XHCI Root Hub Simulation",
    "XHCI Root Hub SS Simulation",
    "XHCI Root Hub USB 2.0 Simulation",
];

/// USB11Bus, USB31Bus, USBBus, ...
static BUS_CONTROLLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^USB(\d+)?Bus$").expect("bus controller pattern"));

// =============================================================================
// Drop Reasons
// =============================================================================

/// Why an entry was left out of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingName,
    BusController,
    SimulatedHub,
    Internal,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingName => "missing_name",
            DropReason::BusController => "bus_controller",
            DropReason::SimulatedHub => "simulated_hub",
            DropReason::Internal => "internal",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Surviving entries plus drop counts
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<RawDevice>,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl FilterOutcome {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

// =============================================================================
// Entry Filter
// =============================================================================

/// Decides which raw entries are real devices
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter {
    include_internal: bool,
}

impl EntryFilter {
    /// Create a new filter, keeping internal devices when `include_internal` is set
    pub fn new(include_internal: bool) -> Self {
        Self { include_internal }
    }

    /// Build from the `usb_internal` setting (off when unset)
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self::new(settings.bool_or(USB_INTERNAL_SETTING, false))
    }

    /// Whether internal devices are kept
    pub fn includes_internal(&self) -> bool {
        self.include_internal
    }

    /// Return the reason an entry must be dropped, if any
    pub fn check(&self, device: &RawDevice) -> Option<DropReason> {
        if !device.contains_key("name") {
            return Some(DropReason::MissingName);
        }

        let name = text(device, "name");
        if BUS_CONTROLLER.is_match(&name) {
            return Some(DropReason::BusController);
        }
        if SIMULATED_HUBS.contains(&&*name) {
            return Some(DropReason::SimulatedHub);
        }

        if !self.include_internal && flag(device, "internal") {
            return Some(DropReason::Internal);
        }

        None
    }

    /// Split a payload into kept entries (in order) and drop counts
    pub fn apply(&self, devices: Vec<RawDevice>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for device in devices {
            match self.check(&device) {
                Some(reason) => {
                    debug!(reason = %reason, name = %text(&device, "name"), "Dropping USB entry");
                    *outcome.dropped.entry(reason).or_insert(0) += 1;
                }
                None => outcome.kept.push(device),
            }
        }

        outcome
    }
}
