//! Boundary to the cloud platform SDK.
//!
//! Everything the hooks and the upload tracker need from the platform goes
//! through the traits in this module. The bundled [`http`] module implements
//! them over REST; tests and embedders can supply their own.
//!
//! # Upload transport contract
//!
//! [`UploadTransport::upload_file`] registers a single upload and returns its
//! id and abort token without blocking. The listener then receives zero or
//! more [`UploadListener::on_progress`] calls followed by exactly one of
//! [`UploadListener::on_success`] or [`UploadListener::on_error`]. A
//! registration error means no listener call will ever follow.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, UploadFailure};

pub mod http;
pub mod types;

pub use types::*;

/// Parameters the provider hands to an [`SdkFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkParams {
    pub environment: String,
    pub app_id: String,
    pub api_url: String,
    pub token_type: String,
    pub api_token: Option<String>,
}

/// Builds SDK handles for the provider.
#[async_trait]
pub trait SdkFactory: Send + Sync + std::fmt::Debug {
    async fn create(&self, params: &SdkParams) -> Result<Arc<dyn Sdk>>;
}

/// The opaque client handle.
#[async_trait]
pub trait Sdk: Send + Sync + std::fmt::Debug {
    fn auth(&self) -> &dyn AuthApi;
    fn user(&self) -> &dyn UserApi;
    fn database(&self, collection_id: &str) -> Box<dyn CollectionApi + '_>;
    fn chat(&self) -> &dyn ChatApi;
    fn webhook(&self) -> &dyn WebhookApi;
    fn uploader(&self) -> Arc<dyn UploadTransport>;

    /// Open a realtime chat connection.
    async fn chat_websocket(&self, options: ChatSocketOptions) -> Result<Box<dyn ChatSocket>>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials, options: CallOptions) -> Result<Session>;
    async fn register(&self, registration: &Registration, options: CallOptions) -> Result<Session>;
    /// Resolve the current user from the stored token, `None` when signed out.
    async fn authorize(&self, options: CallOptions) -> Result<Option<UserRecord>>;
    async fn logout(&self, options: CallOptions) -> Result<()>;
    async fn refresh_token(&self, options: CallOptions) -> Result<Session>;
    async fn forgot_password(&self, email: &str, options: CallOptions) -> Result<()>;
}

#[async_trait]
pub trait UserApi: Send + Sync {
    async fn update_profile(
        &self,
        changes: &serde_json::Value,
        options: CallOptions,
    ) -> Result<UserRecord>;
    async fn change_password(&self, change: &PasswordChange, options: CallOptions) -> Result<()>;
    async fn get(&self, user_id: &str, options: CallOptions) -> Result<UserRecord>;
    async fn list(&self, query: &serde_json::Value, options: CallOptions)
    -> Result<Vec<UserRecord>>;
    async fn delete(&self, user_id: &str, options: CallOptions) -> Result<()>;
}

/// Document operations on one collection.
#[async_trait]
pub trait CollectionApi: Send + Sync {
    async fn find(&self, query: &serde_json::Value, options: CallOptions)
    -> Result<serde_json::Value>;
    async fn find_one(&self, id: &str, options: CallOptions) -> Result<serde_json::Value>;
    async fn insert(&self, doc: &serde_json::Value, options: CallOptions)
    -> Result<serde_json::Value>;
    async fn update(
        &self,
        id: &str,
        doc: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value>;
    async fn delete(&self, id: &str, options: CallOptions) -> Result<serde_json::Value>;
    async fn count(&self, query: &serde_json::Value, options: CallOptions) -> Result<u64>;
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn create_room(&self, room: &serde_json::Value, options: CallOptions)
    -> Result<serde_json::Value>;
    async fn list_rooms(&self, options: CallOptions) -> Result<serde_json::Value>;
    async fn send_message(
        &self,
        room_id: &str,
        message: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value>;
    async fn list_messages(
        &self,
        room_id: &str,
        query: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value>;
    async fn delete_message(
        &self,
        room_id: &str,
        message_id: &str,
        options: CallOptions,
    ) -> Result<serde_json::Value>;
}

/// A live chat connection.
#[async_trait]
pub trait ChatSocket: Send + std::fmt::Debug {
    async fn send(&mut self, event: ChatEvent) -> Result<()>;
    /// Next inbound event, `None` once the connection is closed.
    async fn next(&mut self) -> Option<Result<ChatEvent>>;
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait WebhookApi: Send + Sync {
    async fn call(
        &self,
        webhook_id: &str,
        request: WebhookRequest,
        options: CallOptions,
    ) -> Result<serde_json::Value>;
}

/// Receives asynchronous events for one registered upload.
pub trait UploadListener: Send + Sync {
    fn on_progress(&self, progress: TransferProgress);
    fn on_success(&self, file_id: String, url: String);
    fn on_error(&self, error: UploadFailure);
}

/// Returned synchronously by [`UploadTransport::upload_file`].
#[derive(Debug, Clone)]
pub struct UploadRegistration {
    pub upload_id: String,
    /// Cancelling aborts the transfer.
    pub abort: CancellationToken,
}

pub trait UploadTransport: Send + Sync + std::fmt::Debug {
    fn upload_file(
        &self,
        file: FileHandle,
        options: &UploadOptions,
        listener: Arc<dyn UploadListener>,
    ) -> std::result::Result<UploadRegistration, UploadFailure>;
}
