//! In-Memory Device Store
//!
//! Concurrent in-memory record storage using DashMap, keyed by owner.

use crate::domain::ports::{DeviceRecord, DeviceStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-memory device records, grouped by owner serial number
pub struct MemoryDeviceStore {
    /// Records per owner, in insertion order
    owners: DashMap<String, Vec<DeviceRecord>>,
    /// Last assigned record id
    last_id: AtomicU64,
    /// Is backend available
    available: AtomicBool,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self {
            owners: DashMap::new(),
            last_id: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Number of owners with at least one stored record
    pub fn owner_count(&self) -> usize {
        self.owners.iter().filter(|entry| !entry.value().is_empty()).count()
    }

    /// Total stored records across owners
    pub fn record_count(&self) -> usize {
        self.owners.iter().map(|entry| entry.value().len()).sum()
    }

    /// Set availability (for testing)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::Storage {
                backend: self.backend_name().to_string(),
                reason: "backend unavailable".to_string(),
            })
        }
    }
}

impl Default for MemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn delete_where(&self, serial_number: &str) -> Result<usize> {
        self.ensure_available()?;
        Ok(self
            .owners
            .remove(serial_number)
            .map(|(_, records)| records.len())
            .unwrap_or(0))
    }

    async fn insert(&self, mut record: DeviceRecord) -> Result<DeviceRecord> {
        self.ensure_available()?;
        record.id = Some(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.owners
            .entry(record.serial_number.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list(&self, serial_number: &str) -> Result<Vec<DeviceRecord>> {
        self.ensure_available()?;
        Ok(self
            .owners
            .get(serial_number)
            .map(|records| records.value().clone())
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
