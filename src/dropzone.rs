//! Drop target and file-picker adapter.
//!
//! Normalizes file-picker changes and drag-and-drop gestures into one
//! "files selected" callback. Only dropped files are filtered against the
//! accept list; picker selections are assumed to be filtered by the picker.
//!
//! Drag hover is tracked with a short delay on `drag_leave` so crossing a
//! child element boundary mid-drag does not flicker the hover state. The
//! delay runs on the ambient tokio runtime; without one the hover state is
//! cleared immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::sdk::FileHandle;

/// Default delay before a drag-leave clears the hover state.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(50);

/// Callback receiving the selected files.
pub type FilesSelected = Arc<dyn Fn(Vec<FileHandle>) + Send + Sync>;

#[derive(Clone)]
pub struct DropZoneConfig {
    /// MIME types (`image/png`), wildcards (`image/*`) or extensions (`.pdf`).
    /// Empty accepts everything.
    pub accept: Vec<String>,
    pub hover_delay: Duration,
    pub on_files: FilesSelected,
}

impl DropZoneConfig {
    pub fn new(on_files: impl Fn(Vec<FileHandle>) + Send + Sync + 'static) -> Self {
        Self {
            accept: Vec::new(),
            hover_delay: DEFAULT_HOVER_DELAY,
            on_files: Arc::new(on_files),
        }
    }

    #[must_use]
    pub fn accept<I, S>(mut self, accept: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept = accept.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn hover_delay(mut self, delay: Duration) -> Self {
        self.hover_delay = delay;
        self
    }
}

impl std::fmt::Debug for DropZoneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropZoneConfig")
            .field("accept", &self.accept)
            .field("hover_delay", &self.hover_delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct DropZone {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: DropZoneConfig,
    dragging: watch::Sender<bool>,
    // Bumped on every enter/over/drop; a pending leave only applies if unchanged.
    generation: AtomicU64,
}

impl DropZone {
    pub fn new(config: DropZoneConfig) -> Self {
        let (dragging, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                dragging,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_dragging(&self) -> bool {
        *self.inner.dragging.borrow()
    }

    /// Follow hover state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.dragging.subscribe()
    }

    /// Files chosen through the file picker, forwarded unfiltered.
    pub fn on_input_change(&self, files: Vec<FileHandle>) {
        if files.is_empty() {
            return;
        }
        debug!(name: "dropzone.input", files = files.len(), "Files selected");
        (self.inner.config.on_files)(files);
    }

    pub fn on_drag_enter(&self) {
        self.hover();
    }

    pub fn on_drag_over(&self) {
        self.hover();
    }

    /// Clear the hover state after the configured delay unless the drag
    /// re-enters first.
    pub fn on_drag_leave(&self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            trace!(name: "dropzone.leave.immediate", "No runtime for the hover delay");
            self.inner.leave(generation);
            return;
        };
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.config.hover_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.leave(generation);
        });
    }

    /// Files dropped on the target; filtered by the accept list.
    pub fn on_drop(&self, files: Vec<FileHandle>) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner
            .dragging
            .send_if_modified(|dragging| std::mem::replace(dragging, false));

        let total = files.len();
        let accepted: Vec<FileHandle> = files
            .into_iter()
            .filter(|file| accepts(&self.inner.config.accept, file))
            .collect();
        debug!(name: "dropzone.drop", total, accepted = accepted.len(), "Files dropped");
        if !accepted.is_empty() {
            (self.inner.config.on_files)(accepted);
        }
    }

    fn hover(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if self
            .inner
            .dragging
            .send_if_modified(|dragging| !std::mem::replace(dragging, true))
        {
            trace!(name: "dropzone.hover", "Drag entered");
        }
    }
}

impl Inner {
    /// Clear hover unless a drag event arrived since `generation` was read.
    fn leave(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.dragging
                .send_if_modified(|dragging| std::mem::replace(dragging, false));
        }
    }
}

/// Whether `file` matches any entry of `accept`.
pub fn accepts(accept: &[String], file: &FileHandle) -> bool {
    if accept.is_empty() {
        return true;
    }
    let mime = file.mime_type.to_lowercase();
    let extension = file.extension();
    accept.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        if entry.starts_with('.') {
            extension.as_deref() == Some(entry.as_str())
        } else if let Some(family) = entry.strip_suffix("/*") {
            mime.split('/').next() == Some(family)
        } else {
            mime == entry
        }
    })
}
