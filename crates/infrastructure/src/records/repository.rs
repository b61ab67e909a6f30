//! File-backed instance record source.
//!
//! The orchestrator rewrites the records file in place whenever the
//! fleet changes. Rather than watching the file, every lookup checks the
//! modification time and reparses when it moved, so a query never sees a
//! snapshot older than the file by more than one request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use fleet_dns_application::ports::RecordSource;
use fleet_dns_domain::{RecordSet, RecordsError};

pub struct FileRecordSource {
    path: PathBuf,
    local_domain: String,
    snapshot: ArcSwap<RecordSet>,
    last_modified: Mutex<Option<SystemTime>>,
}

impl FileRecordSource {
    /// Loads the records file once up front, so a broken file fails the
    /// process at startup instead of at the first query.
    pub async fn open(
        path: impl Into<PathBuf>,
        local_domain: &str,
    ) -> Result<Self, RecordsError> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RecordsError::FileRead(path.display().to_string(), e.to_string()))?;
        let set = RecordSet::from_json(&raw, local_domain)?;
        let modified = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .ok();

        info!(path = %path.display(), records = set.len(), "Loaded instance records");

        Ok(Self {
            path,
            local_domain: local_domain.to_string(),
            snapshot: ArcSwap::from_pointee(set),
            last_modified: Mutex::new(modified),
        })
    }

    async fn refresh_if_changed(&self) {
        let modified = match tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
        {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to stat records file");
                return;
            }
        };

        let mut last = self.last_modified.lock().await;
        if *last == Some(modified) {
            return;
        }

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read records file");
                return;
            }
        };

        match RecordSet::from_json(&raw, &self.local_domain) {
            Ok(set) => {
                info!(records = set.len(), "Reloaded instance records");
                self.snapshot.store(Arc::new(set));
            }
            Err(e) => {
                // Keep serving the previous snapshot until the file is
                // rewritten with something parseable.
                warn!(error = %e, "Records file unparseable, keeping previous snapshot");
            }
        }
        *last = Some(modified);
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn record_set(&self) -> Arc<RecordSet> {
        self.refresh_if_changed().await;
        self.snapshot.load_full()
    }
}

/// Fixed record source for deployments without a records file, and for
/// tests.
pub struct StaticRecordSource {
    snapshot: Arc<RecordSet>,
}

impl StaticRecordSource {
    pub fn new(set: RecordSet) -> Self {
        Self {
            snapshot: Arc::new(set),
        }
    }

    pub fn empty() -> Self {
        Self::new(RecordSet::default())
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn record_set(&self) -> Arc<RecordSet> {
        self.snapshot.clone()
    }
}
