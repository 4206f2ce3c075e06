//! Cloud Hooks
//!
//! A thin adapter over a cloud platform SDK: one provider owns the SDK handle
//! and the shared application state, feature hooks expose auth, database,
//! chat, webhook and user management calls, and an upload tracker follows
//! concurrent file uploads through to a single batch verdict.
//!
//! # Architecture
//!
//! - **Provider**: creates the SDK and publishes it into the store
//! - **Store**: single-writer application state with snapshot reads
//! - **Hooks**: stateless pass-throughs that resolve the SDK per call
//! - **Uploader**: per-file upload state machine with batch completion
//!
//! # Modules
//!
//! - [`sdk`]: SDK boundary traits and the bundled HTTP implementation
//! - [`store`]: shared state, actions and reducer
//! - [`provider`]: SDK lifecycle
//! - [`hooks`]: feature hooks
//! - [`uploader`]: upload tracker
//! - [`dropzone`]: drag-and-drop / file-picker adapter
//! - [`config`]: layered client configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod dropzone;
pub mod error;
pub mod hooks;
pub mod provider;
pub mod sdk;
pub mod store;
pub mod uploader;

pub use error::{Error, Result, UploadFailure};
pub use provider::{AppProvider, ProviderPhase, ProviderProps};
pub use store::{Action, AppState, Store};
pub use uploader::{Submission, UploadRecord, UploadStatus, Uploader, UploaderConfig};
