//! Inventory Module
//!
//! The USB ingest pipeline: entry filtering, field normalization, device
//! classification and per-host snapshot replacement.

pub mod classification;
pub mod filter;
pub mod normalize;
pub mod processor;
pub mod snapshot;

pub use classification::*;
pub use filter::*;
pub use normalize::*;
pub use processor::*;
pub use snapshot::*;
