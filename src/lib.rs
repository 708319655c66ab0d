//! USB Inventory - Per-Host USB Peripheral Ingest
//!
//! Receives the USB device list reported by a managed host, drops bus
//! plumbing and simulated hubs, normalizes the reported fields, assigns each
//! device a canonical type and replaces the host's stored snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        REST API / CLI (ingest, show)                         │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                          Inventory Processor                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ Entry Filter │─▶│    Field     │─▶│    Device    │─▶│    Snapshot     │  │
//! │  │              │  │  Normalizer  │  │  Classifier  │  │     Writer      │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────┬────────┘  │
//! ├─────────────────────────────────────────────────────────────────┼───────────┤
//! │                          Device Stores                          ▼            │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │     Memory (DashMap)        │  │      File (one JSON per host)       │   │
//! │  └─────────────────────────────┘  └─────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`inventory`]: Filtering, normalization, classification and snapshot replacement
//! - [`storage`]: Device store backends
//! - [`api`]: REST API server
//! - [`config`]: Service settings
//! - [`metrics`]: Prometheus ingest counters
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use config::Settings;

pub use domain::attributes::RawDevice;
pub use domain::ports::{
    DeviceRecord, DeviceStore, DeviceStoreRef, DeviceType, SettingsProvider,
    SnapshotReplacement,
};

pub use error::{Error, Result};

pub use inventory::{
    parse_payload, Classification, ClassificationReason, ClassifierConfig, DeviceClassifier,
    DropReason, EntryFilter, FieldNormalizer, InventoryProcessor, ProcessSummary,
    SnapshotWriter, TypeRule,
};

pub use metrics::IngestMetrics;

pub use storage::{open_store, FileDeviceStore, FileStoreConfig, MemoryDeviceStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
