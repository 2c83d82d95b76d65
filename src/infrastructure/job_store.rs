//! Job record store
//!
//! One record per job id. Every mutation is a read-modify-write performed
//! under that record's own lock: the change is applied to a copy, the copy is
//! written durably (when the store has a directory), and only then does it
//! replace the in-memory record. A failed write leaves the record untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{JobMetadata, JobRecord, JobStatus, JobUpdate};

/// Error message of runs cut short by a restart
pub const INTERRUPTED_MESSAGE: &str = "interrupted: the process stopped before the run finished";

/// `None` once the record has been deleted
type Slot = Arc<Mutex<Option<JobRecord>>>;

pub struct JobStore {
    records: RwLock<HashMap<String, Slot>>,
    dir: Option<PathBuf>,
}

impl JobStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            dir: None,
        }
    }

    /// Durable store: one JSON file per record in `dir`, loaded on open
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let persist_err = |source| StoreError::Persist {
            path: dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(persist_err)?;

        let mut records = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(persist_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(persist_err)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::Persist {
                    path: path.clone(),
                    source,
                })?;
            let record: JobRecord =
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            records.insert(record.id.clone(), Arc::new(Mutex::new(Some(record))));
        }

        info!(
            "📂 job store opened at {} ({} records)",
            dir.display(),
            records.len()
        );

        let store = Self {
            records: RwLock::new(records),
            dir: Some(dir),
        };
        store.fail_interrupted().await?;
        Ok(store)
    }

    /// Records left `processing` by an earlier process have no live run
    async fn fail_interrupted(&self) -> Result<(), StoreError> {
        let slots: Vec<Slot> = self.records.read().await.values().cloned().collect();
        for slot in slots {
            let id = match slot.lock().await.as_ref() {
                Some(record) if record.status == JobStatus::Processing => record.id.clone(),
                _ => continue,
            };
            warn!("[job {}] ⚠️ run was interrupted, marking failed", id);
            self.modify(&id, |record| {
                JobUpdate::failed(INTERRUPTED_MESSAGE).apply_to(record, Utc::now());
                Ok(true)
            })
            .await?;
        }
        Ok(())
    }

    /// Insert a fresh `queued` record
    pub async fn create(&self, id: &str, metadata: JobMetadata) -> Result<JobRecord, StoreError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::InvalidUpdate {
                id: id.to_string(),
                reason: "job ids must be non-empty file-safe names".to_string(),
            });
        }

        let mut records = self.records.write().await;
        if records.contains_key(id) {
            return Err(StoreError::Duplicate { id: id.to_string() });
        }

        let record = JobRecord::new(id, metadata);
        self.persist(&record).await?;
        records.insert(id.to_string(), Arc::new(Mutex::new(Some(record.clone()))));

        debug!("[job {}] record created", id);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<JobRecord, StoreError> {
        let slot = self.slot(id).await?;
        let guard = slot.lock().await;
        guard.clone().ok_or_else(|| not_found(id))
    }

    /// All records, oldest first
    pub async fn list(&self) -> Vec<JobRecord> {
        let slots: Vec<Slot> = self.records.read().await.values().cloned().collect();

        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(record) = slot.lock().await.clone() {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    /// Apply every supplied field and refresh `updated_at`, or nothing at all
    ///
    /// A completed or failed job keeps its status; only `begin_processing`
    /// takes it out of a terminal state.
    pub async fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        self.modify(id, |record| {
            if let Some(next) = update.status {
                if record.status.is_terminal() && next != record.status {
                    return Err(StoreError::InvalidUpdate {
                        id: id.to_string(),
                        reason: format!("job is already {}, cannot become {}", record.status, next),
                    });
                }
            }
            update.apply_to(record, Utc::now());
            Ok(true)
        })
        .await
    }

    /// Monotonic progress write, applied only while the job is processing
    ///
    /// Returns the stored progress after the call.
    pub async fn report_progress(&self, id: &str, progress: u8) -> Result<u8, StoreError> {
        let progress = progress.min(100);
        let record = self
            .modify(id, |record| {
                if record.status != JobStatus::Processing || progress <= record.progress {
                    return Ok(false);
                }
                record.progress = progress;
                record.updated_at = Utc::now();
                Ok(true)
            })
            .await?;
        Ok(record.progress)
    }

    /// Claim the job for a new run
    ///
    /// Resets progress and results. Fails with `AlreadyProcessing` if another
    /// run holds the job.
    pub async fn begin_processing(&self, id: &str) -> Result<JobRecord, StoreError> {
        self.modify(id, |record| {
            if record.status == JobStatus::Processing {
                return Err(StoreError::AlreadyProcessing { id: id.to_string() });
            }
            record.status = JobStatus::Processing;
            record.progress = 0;
            record.chunks = None;
            record.final_summary = None;
            record.key_terms.clear();
            record.error_message = None;
            record.updated_at = Utc::now();
            Ok(true)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<JobRecord, StoreError> {
        let slot = self.slot(id).await?;
        let mut guard = slot.lock().await;
        let record = guard.clone().ok_or_else(|| not_found(id))?;

        if let Some(path) = self.record_path(id) {
            let removed = tokio::fs::remove_file(&path).await;
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Persist { path, source }),
            }
        }

        *guard = None;
        drop(guard);
        self.records.write().await.remove(id);

        debug!("[job {}] record deleted", id);
        Ok(record)
    }

    async fn slot(&self, id: &str) -> Result<Slot, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Locked read-modify-write; `change` returns whether anything changed
    async fn modify<F>(&self, id: &str, change: F) -> Result<JobRecord, StoreError>
    where
        F: FnOnce(&mut JobRecord) -> Result<bool, StoreError>,
    {
        let slot = self.slot(id).await?;
        let mut guard = slot.lock().await;
        let current = guard.as_ref().ok_or_else(|| not_found(id))?;

        let mut next = current.clone();
        if !change(&mut next)? {
            return Ok(next);
        }
        if next.violates_completion_invariant() {
            return Err(StoreError::InvalidUpdate {
                id: id.to_string(),
                reason: "a completed job needs progress 100 and a final summary".to_string(),
            });
        }

        self.persist(&next).await?;
        *guard = Some(next.clone());
        Ok(next)
    }

    fn record_path(&self, id: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{id}.json")))
    }

    /// Write to a temp file and rename it over the record file
    async fn persist(&self, record: &JobRecord) -> Result<(), StoreError> {
        let Some(path) = self.record_path(&record.id) else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        if let Err(source) = write_then_rename(&tmp, &path, &bytes).await {
            return Err(StoreError::Persist { path, source });
        }
        Ok(())
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, path).await
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}
