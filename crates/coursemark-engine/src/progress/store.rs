use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Lifecycle of a chapter for one reader. COMPLETED is terminal; the
/// in-memory store below enforces that, and remote backends are expected to
/// do the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Per-chapter learning progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub course_id: u64,
    pub chapter_key: String,
    pub status: LearningStatus,
    /// Coarse heuristic 0..=100, not derived from scroll depth.
    pub progress_percentage: u8,
    pub reading_time_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_read_position: Option<u64>,
}

impl LearningProgress {
    /// Default record synthesized on the first visit to a chapter the store
    /// has never seen.
    pub fn started(course_id: u64, chapter_key: &str) -> Self {
        Self {
            course_id,
            chapter_key: chapter_key.to_string(),
            status: LearningStatus::InProgress,
            progress_percentage: 0,
            reading_time_seconds: 0,
            last_read_position: None,
        }
    }
}

/// Incremental update sent to the progress backend.
///
/// `reading_time_seconds` carries only the increment since the last flush,
/// never a cumulative total; the backend does the summing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub course_id: u64,
    pub chapter_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LearningStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressStoreError {
    #[error("progress backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("progress backend error: {0}")]
    Backend(String),
}

/// Backend holding per-reader learning progress.
///
/// Implementations perform the actual I/O and own their bounded request
/// timeout (configurable, commonly 10s); exceeding it surfaces as
/// [`ProgressStoreError::Timeout`]. The tracker never retries a failed call.
pub trait ProgressStore: Send + Sync {
    /// Fetch one chapter's record. `Ok(None)` means not-yet-started; the
    /// caller synthesizes the default record.
    fn fetch_chapter(
        &self,
        course_id: u64,
        chapter_key: &str,
    ) -> Result<Option<LearningProgress>, ProgressStoreError>;

    /// Apply an incremental update and return the resulting record.
    fn update(&self, update: &ProgressUpdate) -> Result<LearningProgress, ProgressStoreError>;
}

/// In-memory progress store, used by the CLI and as the reference double in
/// tests.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<(u64, String), LearningProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, ordered by course and chapter key.
    pub fn records(&self) -> Vec<LearningProgress> {
        let records = self.records.lock().unwrap();
        let mut all: Vec<LearningProgress> = records.values().cloned().collect();
        all.sort_by(|a, b| (a.course_id, &a.chapter_key).cmp(&(b.course_id, &b.chapter_key)));
        all
    }
}

impl ProgressStore for MemoryProgressStore {
    fn fetch_chapter(
        &self,
        course_id: u64,
        chapter_key: &str,
    ) -> Result<Option<LearningProgress>, ProgressStoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&(course_id, chapter_key.to_string())).cloned())
    }

    fn update(&self, update: &ProgressUpdate) -> Result<LearningProgress, ProgressStoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry((update.course_id, update.chapter_key.clone()))
            .or_insert_with(|| LearningProgress::started(update.course_id, &update.chapter_key));

        if let Some(seconds) = update.reading_time_seconds {
            record.reading_time_seconds += seconds;
        }
        if update.completed {
            record.status = LearningStatus::Completed;
            record.progress_percentage = 100;
        } else if record.status != LearningStatus::Completed {
            if let Some(status) = update.status {
                record.status = status;
            }
            if let Some(percentage) = update.progress_percentage {
                record.progress_percentage = percentage;
            }
        }

        Ok(record.clone())
    }
}
