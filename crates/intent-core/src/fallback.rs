//! Unanswered-question log: low-confidence messages kept for offline retraining.

use chrono::{DateTime, Local, SecondsFormat};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Header row of the CSV sink.
pub const CSV_HEADERS: [&str; 5] = [
    "timestamp",
    "dataset",
    "user_message",
    "suggested_intent",
    "confidence",
];

/// One low-confidence resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct UnansweredRecord {
    pub timestamp: DateTime<Local>,
    pub dataset: String,
    pub user_message: String,
    pub suggested_intent: String,
    pub confidence: f32,
}

impl UnansweredRecord {
    pub fn now(
        dataset: impl Into<String>,
        user_message: impl Into<String>,
        suggested_intent: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            dataset: dataset.into(),
            user_message: user_message.into(),
            suggested_intent: suggested_intent.into(),
            confidence,
        }
    }

    fn csv_row(&self) -> [String; 5] {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            self.dataset.clone(),
            self.user_message.clone(),
            self.suggested_intent.clone(),
            format!("{:.4}", self.confidence),
        ]
    }
}

/// Append-only sink for unanswered questions.
///
/// `record` never fails from the caller's point of view: a sink that cannot
/// persist logs the problem and drops the record.
pub trait FallbackSink: Send + Sync {
    fn record(&self, record: UnansweredRecord);
}

/// CSV file sink. Appends are serialized so concurrent records never interleave.
pub struct CsvFallbackLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvFallbackLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &UnansweredRecord) -> Result<(), csv::Error> {
        // A poisoned lock only means another append panicked; the file is still usable.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let write_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if write_header {
            writer.write_record(CSV_HEADERS)?;
        }
        writer.write_record(record.csv_row())?;
        writer.flush()?;
        Ok(())
    }
}

impl FallbackSink for CsvFallbackLogger {
    fn record(&self, record: UnansweredRecord) {
        match self.append(&record) {
            Ok(()) => tracing::info!(
                target: "intent::fallback",
                dataset = record.dataset.as_str(),
                suggested_intent = record.suggested_intent.as_str(),
                confidence = record.confidence,
                "Unanswered question logged"
            ),
            Err(e) => tracing::warn!(
                target: "intent::fallback",
                path = %self.path.display(),
                error = %e,
                "Failed to persist unanswered question; record dropped"
            ),
        }
    }
}

/// In-memory sink, useful for tests and embedding the classifier in other tools.
#[derive(Default)]
pub struct MemoryFallbackLog {
    records: Mutex<Vec<UnansweredRecord>>,
}

impl MemoryFallbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UnansweredRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FallbackSink for MemoryFallbackLog {
    fn record(&self, record: UnansweredRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}
