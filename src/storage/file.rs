//! File Device Store
//!
//! Stores each owner's snapshot as one JSON file under a root directory.
//! Snapshot replacement rewrites the owner's file through a temporary file
//! and a rename, so readers never observe a half-written snapshot.

use crate::domain::ports::{DeviceRecord, DeviceStore, SnapshotReplacement};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SNAPSHOT_EXTENSION: &str = "json";

// =============================================================================
// File Store Configuration
// =============================================================================

/// Configuration for the file store
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one snapshot file per owner
    pub root_path: PathBuf,
    /// Whether to fsync snapshot files before renaming them into place
    pub sync_writes: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("/var/lib/usb-inventory"),
            sync_writes: false,
        }
    }
}

// =============================================================================
// File Store
// =============================================================================

/// JSON-file-backed device store
pub struct FileDeviceStore {
    root_path: PathBuf,
    sync_writes: bool,
    /// Last assigned record id, recovered from disk on open
    last_id: AtomicU64,
    /// Serializes read-modify-write cycles on snapshot files
    write_lock: Mutex<()>,
}

impl FileDeviceStore {
    /// Open a store rooted at `root_path`
    pub async fn with_path(root_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(FileStoreConfig {
            root_path: root_path.into(),
            ..Default::default()
        })
        .await
    }

    /// Open a store with full config, creating the root directory if needed
    pub async fn with_config(config: FileStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.root_path).await?;

        let store = Self {
            root_path: config.root_path,
            sync_writes: config.sync_writes,
            last_id: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        };

        let last_id = store.scan_last_id().await?;
        store.last_id.store(last_id, Ordering::Relaxed);
        debug!(root = %store.root_path.display(), last_id, "Opened file device store");

        Ok(store)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Highest record id found in existing snapshot files
    async fn scan_last_id(&self) -> Result<u64> {
        let mut last_id = 0;
        let mut entries = fs::read_dir(&self.root_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e != SNAPSHOT_EXTENSION).unwrap_or(true) {
                continue;
            }

            match self.read_records(&path).await {
                Ok(records) => {
                    let max = records.iter().filter_map(|r| r.id).max().unwrap_or(0);
                    last_id = last_id.max(max);
                }
                Err(e) => warn!(path = %path.display(), "Skipping unreadable snapshot: {}", e),
            }
        }

        Ok(last_id)
    }

    /// Snapshot file for an owner
    fn snapshot_path(&self, serial_number: &str) -> PathBuf {
        let filename = format!("{}.{}", urlencoding::encode(serial_number), SNAPSHOT_EXTENSION);
        self.root_path.join(filename)
    }

    async fn read_records(&self, path: &Path) -> Result<Vec<DeviceRecord>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| Error::Storage {
            backend: self.backend_name().to_string(),
            reason: format!("corrupt snapshot {}: {}", path.display(), e),
        })
    }

    /// Size of the snapshot about to be discarded; unreadable counts as empty
    async fn prior_count(&self, path: &Path) -> usize {
        match self.read_records(path).await {
            Ok(records) => records.len(),
            Err(e) => {
                warn!(path = %path.display(), "Discarding unreadable snapshot: {}", e);
                0
            }
        }
    }

    async fn write_records(&self, path: &Path, records: &[DeviceRecord]) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let body = serde_json::to_vec_pretty(records)?;

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&body).await?;
        if self.sync_writes {
            file.sync_all().await?;
        }
        drop(file);

        fs::rename(&tmp_path, path).await.map_err(|e| Error::Storage {
            backend: self.backend_name().to_string(),
            reason: format!("failed to move snapshot into place: {}", e),
        })
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl DeviceStore for FileDeviceStore {
    async fn delete_where(&self, serial_number: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let path = self.snapshot_path(serial_number);

        let removed = self.prior_count(&path).await;
        self.remove_file(&path).await?;

        Ok(removed)
    }

    async fn insert(&self, mut record: DeviceRecord) -> Result<DeviceRecord> {
        let _guard = self.write_lock.lock().await;
        let path = self.snapshot_path(&record.serial_number);

        let mut records = self.read_records(&path).await?;
        record.id = Some(self.next_id());
        records.push(record.clone());
        self.write_records(&path, &records).await?;

        Ok(record)
    }

    async fn list(&self, serial_number: &str) -> Result<Vec<DeviceRecord>> {
        self.read_records(&self.snapshot_path(serial_number)).await
    }

    /// Swap the owner's file in one rename instead of delete-then-insert
    async fn replace_snapshot(
        &self,
        serial_number: &str,
        records: Vec<DeviceRecord>,
    ) -> Result<SnapshotReplacement> {
        let _guard = self.write_lock.lock().await;
        let path = self.snapshot_path(serial_number);

        let removed = self.prior_count(&path).await;

        let inserted: Vec<DeviceRecord> = records
            .into_iter()
            .map(|mut record| {
                record.serial_number = serial_number.to_string();
                record.id = Some(self.next_id());
                record
            })
            .collect();

        if inserted.is_empty() {
            self.remove_file(&path).await?;
        } else {
            self.write_records(&path, &inserted).await?;
        }

        Ok(SnapshotReplacement { removed, inserted })
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}
