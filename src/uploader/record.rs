use std::sync::Weak;

use tokio_util::sync::CancellationToken;

use super::Shared;
use crate::error::UploadFailure;

/// Per-file lifecycle: `Started → Progress* → Success | Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Started,
    Progress {
        /// Percentage, 0–100, rounded to two decimals.
        progress: f64,
        bytes_uploaded: u64,
        bytes_total: u64,
    },
    Success {
        file_id: String,
        file_url: String,
    },
    Failed {
        error: UploadFailure,
    },
}

impl UploadStatus {
    /// `Success` and `Failed` admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Progress { .. } => "progress",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One tracked file.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    /// Transport-issued id, or a generated one for registration failures.
    pub id: String,
    pub file_name: String,
    pub status: UploadStatus,
    cancel: CancelHandle,
}

impl UploadRecord {
    pub(super) fn new(
        id: String,
        file_name: String,
        status: UploadStatus,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            id,
            file_name,
            status,
            cancel,
        }
    }

    /// Abort the transfer and drop this record from its tracker.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Capability that cancels this upload, usable after the record is dropped.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Option<f64> {
        match self.status {
            UploadStatus::Progress { progress, .. } => Some(progress),
            _ => None,
        }
    }

    pub fn file_url(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Success { file_url, .. } => Some(file_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&UploadFailure> {
        match &self.status {
            UploadStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Cancel capability bound to one upload.
#[derive(Clone)]
pub struct CancelHandle {
    id: String,
    abort: Option<CancellationToken>,
    shared: Weak<Shared>,
}

impl CancelHandle {
    pub(super) fn new(id: String, abort: Option<CancellationToken>, shared: Weak<Shared>) -> Self {
        Self { id, abort, shared }
    }

    /// Abort the transport upload and remove the record right away. Does not
    /// wait for the transport to acknowledge the abort.
    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.cancel();
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &self.id)
            .field("abortable", &self.abort.is_some())
            .finish_non_exhaustive()
    }
}
