//! Feature hooks over the SDK held in a [`Store`](crate::store::Store).
//!
//! Every method resolves the SDK from the store on each call and fails with
//! [`Error::NotInitialized`](crate::Error::NotInitialized) while it is absent.
//! Calls are single pass-throughs: no retries, caching or coalescing. Methods
//! that yield user or session data also publish it into the store.
//!
//! - [`Auth`]: login, registration, session resolution
//! - [`Database`]: document collections
//! - [`Chat`] / [`ChatWebSocket`]: rooms, messages, realtime events
//! - [`Webhook`]: webhook invocation
//! - [`UserInteraction`]: profile and user administration

mod auth;
mod chat;
mod database;
mod user;
mod webhook;

pub use auth::Auth;
pub use chat::{Chat, ChatWebSocket};
pub use database::{Collection, Database};
pub use user::UserInteraction;
pub use webhook::Webhook;
