//! Domain layer - Core record types and port definitions
//!
//! This module defines the device record model and the traits (ports) that
//! storage and configuration adapters implement, following hexagonal
//! architecture principles.

pub mod attributes;
pub mod ports;

pub use attributes::RawDevice;
pub use ports::*;
