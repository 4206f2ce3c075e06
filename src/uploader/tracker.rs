//! File map and batch bookkeeping, free of any locking or callbacks.

use super::record::{UploadRecord, UploadStatus};
use crate::error::UploadFailure;
use crate::sdk::TransferProgress;

/// An event reported by the transport for one upload.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TransferEvent {
    Progress(TransferProgress),
    Success { file_id: String, url: String },
    Failed(UploadFailure),
}

/// Batch verdict, reached once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Completion {
    Succeeded,
    Failed,
}

/// What the caller must announce after a mutation.
#[derive(Debug)]
pub(super) struct Notice {
    pub snapshot: Vec<UploadRecord>,
    pub update: bool,
    pub completion: Option<Completion>,
}

#[derive(Debug)]
pub(super) struct Tracker {
    files: Vec<UploadRecord>,
    batch_size: usize,
    completion_fired: bool,
    first_run: bool,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            batch_size: 0,
            completion_fired: false,
            first_run: true,
        }
    }

    pub fn snapshot(&self) -> Vec<UploadRecord> {
        self.files.clone()
    }

    pub fn find(&self, id: &str) -> Option<&UploadRecord> {
        self.files.iter().find(|record| record.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.files
            .iter()
            .any(|record| matches!(record.status, UploadStatus::Progress { .. }))
    }

    /// Start tracking a new batch. Records of earlier batches stay in the map.
    pub fn begin_batch(&mut self, size: usize) {
        self.batch_size = size;
        self.completion_fired = false;
    }

    pub fn insert(&mut self, record: UploadRecord) {
        self.files.push(record);
    }

    /// Apply a transport event. Returns `false` when nothing changed: the id
    /// is unknown (e.g. cancelled) or the record is already terminal.
    pub fn apply(&mut self, id: &str, event: TransferEvent) -> bool {
        let Some(record) = self.files.iter_mut().find(|record| record.id == id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        record.status = match event {
            TransferEvent::Progress(progress) => UploadStatus::Progress {
                progress: round_percentage(progress.percentage),
                bytes_uploaded: progress.bytes_uploaded,
                bytes_total: progress.bytes_total,
            },
            TransferEvent::Success { file_id, url } => UploadStatus::Success {
                file_id,
                file_url: url,
            },
            TransferEvent::Failed(error) => UploadStatus::Failed { error },
        };
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|record| record.id != id);
        self.files.len() != before
    }

    /// Forget every record and re-arm first-run suppression.
    pub fn reset(&mut self) {
        self.files.clear();
        self.batch_size = 0;
        self.completion_fired = false;
        self.first_run = true;
    }

    /// Run after every mutation: decide whether `on_update` fires and
    /// whether this mutation completes the batch.
    pub fn observe(&mut self) -> Notice {
        let first_run = std::mem::replace(&mut self.first_run, false);
        let update = !first_run && !self.completion_fired;
        let completion = self.check_completion();
        Notice {
            snapshot: self.snapshot(),
            update,
            completion,
        }
    }

    // Counts terminal records across the whole map, not only the active
    // batch's ids.
    fn check_completion(&mut self) -> Option<Completion> {
        if self.completion_fired || self.batch_size == 0 {
            return None;
        }
        let terminal: Vec<&UploadRecord> = self
            .files
            .iter()
            .filter(|record| record.status.is_terminal())
            .collect();
        if terminal.len() < self.batch_size {
            return None;
        }
        self.completion_fired = true;
        let any_failed = terminal
            .iter()
            .any(|record| matches!(record.status, UploadStatus::Failed { .. }));
        Some(if any_failed {
            Completion::Failed
        } else {
            Completion::Succeeded
        })
    }
}

fn round_percentage(percentage: f64) -> f64 {
    (percentage.clamp(0.0, 100.0) * 100.0).round() / 100.0
}
