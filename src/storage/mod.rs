//! Device Store Backends
//!
//! Implementations of the [`DeviceStore`](crate::domain::DeviceStore) port.

mod file;
mod memory;

pub use file::{FileDeviceStore, FileStoreConfig};
pub use memory::MemoryDeviceStore;

use crate::domain::ports::DeviceStoreRef;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Open the file store when a data directory is given, else an in-memory store
pub async fn open_store(data_dir: Option<PathBuf>) -> Result<DeviceStoreRef> {
    match data_dir {
        Some(root_path) => Ok(Arc::new(FileDeviceStore::with_path(root_path).await?)),
        None => Ok(Arc::new(MemoryDeviceStore::new())),
    }
}
