//! Best-effort capture of answer snapshots.
//!
//! Every accepted answer produces one [`ResponseRecord`] that is appended to each
//! configured sink exactly once. Sink failures are logged and handed back as a
//! [`SaveReport`]; they never interrupt the traversal that produced the record.

mod dump;
mod relay;
mod sqlite;

pub use dump::{write_csv, DumpError};
pub use relay::{HttpRelay, RelayOptions};
pub use sqlite::SqliteResponseStore;

use crate::survey::{AnswerSet, ScoreResult, TraversalSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Append-only log entry for one traversal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub survey_version: String,
    pub path_id: String,
    pub q_idx: usize,
    pub answers: AnswerSet,
    pub finished: bool,
    pub result: Option<ScoreResult>,
}

impl ResponseRecord {
    pub fn from_snapshot(
        user_id: impl Into<String>,
        survey_version: impl Into<String>,
        snapshot: TraversalSnapshot,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            user_id: user_id.into(),
            survey_version: survey_version.into(),
            path_id: snapshot.selected_path_id,
            q_idx: snapshot.current_index,
            answers: snapshot.answers,
            finished: snapshot.finished,
            result: snapshot.result,
        }
    }
}

/// Destination for response records (local table, remote endpoint, ...).
#[async_trait]
pub trait ResponseSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn record(&self, record: &ResponseRecord) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("local store failed: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("relay rejected the record with status {status}")]
    Rejected { status: u16 },
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one sink for one record.
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: &'static str,
    pub error: SinkError,
}

/// Outcome of offering a record to every sink.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub delivered: Vec<&'static str>,
    pub failures: Vec<SinkFailure>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human readable, non-blocking warnings for the presentation layer.
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|failure| format!("{}: {}", failure.sink, failure.error))
            .collect()
    }
}

/// Fans records out to the configured sinks, one attempt each.
#[derive(Clone, Default)]
pub struct ResponseRecorder {
    sinks: Vec<Arc<dyn ResponseSink>>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResponseSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn record(&self, record: &ResponseRecord) -> SaveReport {
        let mut report = SaveReport::default();

        for sink in &self.sinks {
            match sink.record(record).await {
                Ok(()) => {
                    debug!(sink = sink.name(), user_id = %record.user_id, q_idx = record.q_idx, "response recorded");
                    report.delivered.push(sink.name());
                }
                Err(error) => {
                    warn!(sink = sink.name(), user_id = %record.user_id, %error, "failed to record response");
                    report.failures.push(SinkFailure {
                        sink: sink.name(),
                        error,
                    });
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for ResponseRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRecorder")
            .field("sinks", &self.sink_names())
            .finish()
    }
}

/// In-process sink keeping every record in memory. Useful for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ResponseRecord>>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<ResponseRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ResponseSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, record: &ResponseRecord) -> Result<(), SinkError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("memory sink mutex poisoned".to_string()))?;
        guard.push(record.clone());
        Ok(())
    }
}
