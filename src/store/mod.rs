//! Shared application state.
//!
//! One [`Store`] exists per provider. It is a single-writer, many-reader
//! broadcast: every write goes through [`Store::dispatch`] and the pure
//! [`reduce`] function, readers take snapshots with [`Store::get`] or follow
//! changes through [`Store::subscribe`].
//!
//! # Example
//!
//! ```rust
//! use cloud_hooks::store::{Action, AppState, Store};
//!
//! let store = Store::new(AppState {
//!     app: "demo".into(),
//!     ..AppState::default()
//! });
//! store.dispatch(Action::AuthInited(true));
//!
//! assert!(store.get().auth_inited);
//! assert!(store.sdk().is_err());
//! ```

mod reducer;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use crate::error::{Error, Result};
use crate::sdk::{Sdk, UserRecord};

pub use reducer::{Action, AppState, reduce};

/// Clone-cheap handle to the shared application state.
#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot.
    pub fn get(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Apply `action` through the reducer and notify subscribers.
    pub fn dispatch(&self, action: Action) {
        trace!(name: "store.dispatch", action = action.kind(), "Dispatching action");
        self.tx
            .send_modify(|state| *state = reduce(state.clone(), action));
    }

    /// Receiver that observes every dispatched state.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// The SDK handle, or [`Error::NotInitialized`] while it is absent.
    pub fn sdk(&self) -> Result<Arc<dyn Sdk>> {
        self.tx
            .borrow()
            .sdk_instance
            .clone()
            .ok_or(Error::NotInitialized)
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.tx.borrow().user.clone()
    }

    pub fn auth_inited(&self) -> bool {
        self.tx.borrow().auth_inited
    }

    /// Whether both handles point at the same provider state.
    pub fn same_store(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}
