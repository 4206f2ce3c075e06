//! Multi-file upload tracker.
//!
//! [`Uploader::submit`] registers one transport upload per file and seeds a
//! [`UploadRecord`] for each. Transport events are folded into the record map
//! as they arrive, in whatever order and on whatever thread the transport
//! reports them. After every mutation:
//!
//! - `on_update` receives the full snapshot, except for the first mutation
//!   after construction or [`Uploader::reset`] and after the active batch has
//!   been decided;
//! - once as many records are terminal as the batch had files, exactly one of
//!   `on_failed` (any failure) or `on_success` fires, once per batch.
//!
//! The first mutation after construction or [`Uploader::reset`] is the
//! seeding of the first batch, so its `Started` records are never passed to
//! `on_update`; read them through [`Uploader::files`] instead. Later batches
//! are announced from their seeding onwards.
//!
//! Terminal records are counted across the whole map, so records left over
//! from an earlier batch count towards the active one.
//!
//! Callbacks run outside the tracker lock, in the order the mutations were
//! applied, one at a time. An event reported while another thread is
//! delivering callbacks is queued and handed to that thread, as is an event
//! raised from inside a callback.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloud_hooks::sdk::FileHandle;
//! use cloud_hooks::store::Store;
//! use cloud_hooks::uploader::{Uploader, UploaderConfig};
//!
//! # fn example(store: &Store) -> cloud_hooks::Result<()> {
//! let uploader = Uploader::new(
//!     store,
//!     UploaderConfig::default()
//!         .on_update(|files| println!("{} files in flight", files.len()))
//!         .on_success(|files| println!("uploaded {} files", files.len()))
//!         .on_failed(|files| eprintln!("batch failed: {files:?}")),
//! );
//! uploader.submit(vec![FileHandle::new("notes.txt", b"hello".to_vec())])?;
//! # Ok(())
//! # }
//! ```

mod listener;
mod record;
mod tracker;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::sdk::{FileHandle, UploadListener, UploadOptions, UploadTransport};
use crate::store::Store;

use listener::FileListener;
use tracker::{Completion, Notice, TransferEvent, Tracker};

pub use record::{CancelHandle, UploadRecord, UploadStatus};

/// Callback receiving a snapshot of every tracked record.
pub type FilesCallback = Arc<dyn Fn(&[UploadRecord]) + Send + Sync>;

/// Gate run before a batch is accepted; `false` vetoes it.
pub type BeforeUploadCallback = Arc<dyn Fn(&[FileHandle]) -> bool + Send + Sync>;

/// Options and callbacks for an [`Uploader`].
#[derive(Clone, Default)]
pub struct UploaderConfig {
    pub options: UploadOptions,
    pub on_before_upload: Option<BeforeUploadCallback>,
    pub on_update: Option<FilesCallback>,
    pub on_success: Option<FilesCallback>,
    pub on_failed: Option<FilesCallback>,
}

impl UploaderConfig {
    #[must_use]
    pub fn options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn on_before_upload(
        mut self,
        gate: impl Fn(&[FileHandle]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.on_before_upload = Some(Arc::new(gate));
        self
    }

    #[must_use]
    pub fn on_update(mut self, callback: impl Fn(&[UploadRecord]) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_success(
        mut self,
        callback: impl Fn(&[UploadRecord]) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_failed(mut self, callback: impl Fn(&[UploadRecord]) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("options", &self.options)
            .field("on_before_upload", &self.on_before_upload.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .finish()
    }
}

/// Outcome of [`Uploader::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Records were seeded under these ids, in submission order.
    Accepted { ids: Vec<String> },
    /// `on_before_upload` returned `false`.
    Vetoed,
    /// No files were given.
    Empty,
}

#[derive(Debug)]
enum TransportSource {
    Store(Store),
    Fixed(Arc<dyn UploadTransport>),
}

struct Shared {
    tracker: Mutex<Tracker>,
    outbox: Mutex<Outbox>,
    source: TransportSource,
    config: UploaderConfig,
}

/// Notices waiting to be announced, in mutation order.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<Notice>,
    draining: bool,
}

/// Tracks concurrent uploads and reports batch outcomes.
#[derive(Clone)]
pub struct Uploader {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tracker = self.shared.lock();
        f.debug_struct("Uploader")
            .field("tracker", &*tracker)
            .field("source", &self.shared.source)
            .field("config", &self.shared.config)
            .finish()
    }
}

impl Uploader {
    /// Upload through the SDK held in `store`, resolved on each submit.
    pub fn new(store: &Store, config: UploaderConfig) -> Self {
        Self::from_source(TransportSource::Store(store.clone()), config)
    }

    /// Upload through an explicit transport.
    pub fn with_transport(transport: Arc<dyn UploadTransport>, config: UploaderConfig) -> Self {
        Self::from_source(TransportSource::Fixed(transport), config)
    }

    fn from_source(source: TransportSource, config: UploaderConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                tracker: Mutex::new(Tracker::new()),
                outbox: Mutex::new(Outbox::default()),
                source,
                config,
            }),
        }
    }

    /// Start one upload per file.
    ///
    /// Per-file failures never surface here: a transport that refuses to
    /// register a file yields a `Failed` record under a generated id. The only
    /// error is [`crate::Error::NotInitialized`] when the store has no SDK.
    pub fn submit(&self, files: Vec<FileHandle>) -> Result<Submission> {
        if files.is_empty() {
            return Ok(Submission::Empty);
        }
        if let Some(gate) = &self.shared.config.on_before_upload {
            if !gate(&files) {
                debug!(name: "upload.batch.vetoed", files = files.len(), "Batch vetoed");
                return Ok(Submission::Vetoed);
            }
        }
        let transport = self.shared.transport()?;
        let batch_size = files.len();

        let mut records = Vec::with_capacity(batch_size);
        let mut bindings = Vec::with_capacity(batch_size);
        for file in files {
            let file_name = file.name.clone();
            let listener = Arc::new(FileListener::new(Arc::downgrade(&self.shared)));
            let events = Arc::clone(&listener) as Arc<dyn UploadListener>;
            match transport.upload_file(file, &self.shared.config.options, events) {
                Ok(registration) => {
                    debug!(
                        name: "upload.file.registered",
                        upload_id = %registration.upload_id,
                        file = %file_name,
                        "Upload registered"
                    );
                    let cancel = CancelHandle::new(
                        registration.upload_id.clone(),
                        Some(registration.abort),
                        Arc::downgrade(&self.shared),
                    );
                    bindings.push((registration.upload_id.clone(), listener));
                    records.push(UploadRecord::new(
                        registration.upload_id,
                        file_name,
                        UploadStatus::Started,
                        cancel,
                    ));
                }
                Err(error) => {
                    let id = format!("error-{}", Uuid::new_v4());
                    warn!(
                        name: "upload.file.registration_failed",
                        upload_id = %id,
                        file = %file_name,
                        error = %error,
                        "Upload registration failed"
                    );
                    let cancel = CancelHandle::new(id.clone(), None, Arc::downgrade(&self.shared));
                    records.push(UploadRecord::new(
                        id,
                        file_name,
                        UploadStatus::Failed { error },
                        cancel,
                    ));
                }
            }
        }

        let ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();
        let mut tracker = self.shared.lock();
        tracker.begin_batch(batch_size);
        for record in records {
            tracker.insert(record);
        }
        info!(name: "upload.batch.started", batch_size, "Upload batch started");
        self.shared.commit(tracker);

        // Events the transport emitted before its registration returned are
        // replayed now that the records exist.
        for (id, listener) in bindings {
            listener.bind(&id);
        }

        Ok(Submission::Accepted { ids })
    }

    /// Current snapshot of every tracked record.
    pub fn files(&self) -> Vec<UploadRecord> {
        self.shared.lock().snapshot()
    }

    /// True while any record is in `Progress`.
    pub fn is_busy(&self) -> bool {
        self.shared.lock().is_busy()
    }

    /// Cancel the record with `id`. Returns `false` for unknown ids.
    pub fn cancel(&self, id: &str) -> bool {
        let handle = self.shared.lock().find(id).map(UploadRecord::cancel_handle);
        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget every record and all batch bookkeeping. In-flight transfers are
    /// not aborted; their later events are dropped.
    pub fn reset(&self) {
        self.shared.lock().reset();
        debug!(name: "upload.reset", "Upload tracker reset");
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transport(&self) -> Result<Arc<dyn UploadTransport>> {
        match &self.source {
            TransportSource::Store(store) => Ok(store.sdk()?.uploader()),
            TransportSource::Fixed(transport) => Ok(Arc::clone(transport)),
        }
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, id: &str, event: TransferEvent) {
        let mut tracker = self.lock();
        if !tracker.apply(id, event) {
            trace!(name: "upload.event.dropped", upload_id = %id, "Event for unknown or finished upload");
            return;
        }
        self.commit(tracker);
    }

    fn remove(&self, id: &str) {
        let mut tracker = self.lock();
        if !tracker.remove(id) {
            return;
        }
        debug!(name: "upload.file.cancelled", upload_id = %id, "Upload cancelled");
        self.commit(tracker);
    }

    /// Queue the notice for the mutation just applied to `tracker`, release
    /// the tracker and deliver whatever is queued.
    ///
    /// The notice is queued before the tracker lock is released, so queue
    /// order is mutation order.
    fn commit(&self, mut tracker: MutexGuard<'_, Tracker>) {
        let notice = tracker.observe();
        self.outbox().queue.push_back(notice);
        drop(tracker);
        self.drain();
    }

    /// Announce queued notices until the queue is empty. Returns at once when
    /// another call is already draining; that call picks up our notices.
    fn drain(&self) {
        {
            let mut outbox = self.outbox();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let guard = DrainGuard(self);
        loop {
            // The flag drops in the same critical section that finds the
            // queue empty, so a concurrent `commit` either lands in this
            // queue or starts its own drain.
            let next = {
                let mut outbox = self.outbox();
                let next = outbox.queue.pop_front();
                if next.is_none() {
                    outbox.draining = false;
                }
                next
            };
            match next {
                Some(notice) => self.announce(notice),
                None => {
                    std::mem::forget(guard);
                    return;
                }
            }
        }
    }

    /// Invoke user callbacks for one notice. Holds no lock.
    fn announce(&self, notice: Notice) {
        let Notice {
            snapshot,
            update,
            completion,
        } = notice;

        if update {
            if let Some(on_update) = &self.config.on_update {
                on_update(&snapshot);
            }
        }
        match completion {
            Some(Completion::Succeeded) => {
                info!(name: "upload.batch.completed", outcome = "success", files = snapshot.len(), "Upload batch completed");
                if let Some(on_success) = &self.config.on_success {
                    on_success(&snapshot);
                }
            }
            Some(Completion::Failed) => {
                let failed = snapshot
                    .iter()
                    .filter(|record| matches!(record.status, UploadStatus::Failed { .. }))
                    .count();
                warn!(name: "upload.batch.completed", outcome = "failed", files = snapshot.len(), failed, "Upload batch completed with failures");
                if let Some(on_failed) = &self.config.on_failed {
                    on_failed(&snapshot);
                }
            }
            None => {}
        }
    }
}

/// Releases the draining flag when a callback panics mid-drain.
struct DrainGuard<'a>(&'a Shared);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.outbox().draining = false;
    }
}

