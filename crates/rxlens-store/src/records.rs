//! Result Store: append-only list of stored prescription records.
//!
//! The production backing is a single JSON array file that is read in full and
//! rewritten in full on every append. Appends within one process are
//! serialised by a mutex; separate processes writing the same file are not
//! coordinated.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use rxlens_core::{Error, Result, StoragePayload, StoredPrescriptionRecord};

/// Storage medium for prescription records.
pub trait RecordStore: Send + Sync {
    /// Make the store usable. Idempotent.
    fn initialize(&self) -> Result<()>;

    /// All records in append order.
    fn list(&self) -> Result<Vec<StoredPrescriptionRecord>>;

    /// Append a new record for `payload` and return it.
    fn append(&self, payload: StoragePayload) -> Result<StoredPrescriptionRecord>;
}

/// Next record id: the current millisecond clock, bumped past the last id so
/// ids stay unique and increasing even within the same millisecond.
fn next_id(now_ms: i64, last_id: Option<i64>) -> i64 {
    match last_id {
        Some(last) if last >= now_ms => last + 1,
        _ => now_ms,
    }
}

fn new_record(
    payload: StoragePayload,
    existing: &[StoredPrescriptionRecord],
) -> StoredPrescriptionRecord {
    let now = Utc::now();
    let last_id = existing.iter().map(|r| r.id).max();
    StoredPrescriptionRecord {
        id: next_id(now.timestamp_millis(), last_id),
        data: payload.into_value(),
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

// ---------------------------------------------------------------
// JSON file backing
// ---------------------------------------------------------------

/// Result Store backed by one JSON array file on disk.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<StoredPrescriptionRecord>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store file {} missing, treating as empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::StoreIo(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&data).map_err(|e| {
            Error::StoreCorrupt(format!(
                "{} is not a valid record array: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Rewrite the whole file via a sibling temp file and rename.
    fn write_all(&self, records: &[StoredPrescriptionRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                Error::StoreIo(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }
}

impl RecordStore for JsonFileStore {
    fn initialize(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self.write_lock.lock();
        self.write_all(&[])?;
        info!("Initialized record store at {}", self.path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<StoredPrescriptionRecord>> {
        self.read_all()
    }

    fn append(&self, payload: StoragePayload) -> Result<StoredPrescriptionRecord> {
        let _guard = self.write_lock.lock();

        let mut records = self.read_all()?;
        let record = new_record(payload, &records);
        records.push(record.clone());
        self.write_all(&records)?;

        debug!("Stored record {} ({} total)", record.id, records.len());
        Ok(record)
    }
}

// ---------------------------------------------------------------
// In-memory backing
// ---------------------------------------------------------------

/// Volatile Result Store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredPrescriptionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn list(&self) -> Result<Vec<StoredPrescriptionRecord>> {
        Ok(self.records.read().clone())
    }

    fn append(&self, payload: StoragePayload) -> Result<StoredPrescriptionRecord> {
        let mut records = self.records.write();
        let record = new_record(payload, &records);
        records.push(record.clone());
        Ok(record)
    }
}
