use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use super::Shared;
use super::tracker::TransferEvent;
use crate::error::UploadFailure;
use crate::sdk::{TransferProgress, UploadListener};

/// Routes one upload's transport events into the tracker.
///
/// The upload id is only known once the transport's registration returns, so
/// events reported before that are queued and replayed by [`bind`].
///
/// [`bind`]: FileListener::bind
pub(super) struct FileListener {
    slot: Mutex<Slot>,
    shared: Weak<Shared>,
}

enum Slot {
    Pending(Vec<TransferEvent>),
    Bound(String),
}

impl FileListener {
    pub fn new(shared: Weak<Shared>) -> Self {
        Self {
            slot: Mutex::new(Slot::Pending(Vec::new())),
            shared,
        }
    }

    /// Attach the registered id and flush queued events in arrival order.
    ///
    /// Events reported while the queue is being flushed join the queue, and
    /// the slot only flips to bound once it is empty.
    pub fn bind(&self, id: &str) {
        let shared = self.shared.upgrade();
        loop {
            let pending = {
                let mut slot = self.lock();
                let pending = match &mut *slot {
                    Slot::Pending(events) => std::mem::take(events),
                    Slot::Bound(_) => Vec::new(),
                };
                if pending.is_empty() {
                    *slot = Slot::Bound(id.to_string());
                    return;
                }
                pending
            };
            if let Some(shared) = &shared {
                for event in pending {
                    shared.handle(id, event);
                }
            }
        }
    }

    fn deliver(&self, event: TransferEvent) {
        let id = {
            let mut slot = self.lock();
            match &mut *slot {
                Slot::Pending(events) => {
                    events.push(event);
                    return;
                }
                Slot::Bound(id) => id.clone(),
            }
        };
        if let Some(shared) = self.shared.upgrade() {
            shared.handle(&id, event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UploadListener for FileListener {
    fn on_progress(&self, progress: TransferProgress) {
        self.deliver(TransferEvent::Progress(progress));
    }

    fn on_success(&self, file_id: String, url: String) {
        self.deliver(TransferEvent::Success { file_id, url });
    }

    fn on_error(&self, error: UploadFailure) {
        self.deliver(TransferEvent::Failed(error));
    }
}
