//! Shared types for the SDK boundary.
//!
//! These mirror the platform's API DTOs and are used both by the trait seams
//! and by the bundled HTTP implementation.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Call options
// =============================================================================

/// Which credential a single call should authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// The signed-in user's session token.
    User,
    /// The application token supplied to the provider.
    Api,
    /// No authorization header.
    Anonymous,
}

/// Per-call override bag passed through to the SDK.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Credential override; `None` lets the SDK pick.
    pub auth: Option<AuthMode>,
    /// Return the whole response envelope instead of its `data` member.
    pub raw_response: bool,
}

impl CallOptions {
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn raw(mut self) -> Self {
        self.raw_response = true;
        self
    }
}

// =============================================================================
// Users and sessions
// =============================================================================

/// An authenticated user as returned by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique identifier.
    pub id: String,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Role within the application.
    #[serde(default)]
    pub role: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Application specific profile fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Email/password credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up request.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of a login, registration or token refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for subsequent user calls.
    pub token: String,
    /// Optional refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The signed-in user.
    pub user: UserRecord,
}

/// Password change request.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

// =============================================================================
// Chat
// =============================================================================

/// Options for a realtime chat connection.
#[derive(Debug, Clone, Default)]
pub struct ChatSocketOptions {
    /// Room to subscribe to; `None` receives every room the user belongs to.
    pub room_id: Option<String>,
    /// Credential override for the handshake.
    pub auth: Option<AuthMode>,
}

/// A realtime chat frame, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Event name, e.g. `message`, `typing`, `join`.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl ChatEvent {
    pub fn message(room_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            event: "message".to_string(),
            room_id: Some(room_id.into()),
            payload: serde_json::json!({ "text": text.into() }),
            sent_at: Some(Utc::now()),
        }
    }
}

// =============================================================================
// Webhooks
// =============================================================================

/// Request forwarded to a webhook.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// HTTP method, defaults to `POST`.
    pub method: Option<String>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<serde_json::Value>,
}

// =============================================================================
// Uploads
// =============================================================================

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// File name, informational.
    pub name: String,
    /// MIME type, guessed from the name when not given.
    pub mime_type: String,
    data: Arc<[u8]>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            data: Arc::from(data.into()),
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, data))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lower-cased extension including the leading dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
    }
}

/// Transport options for a single upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadOptions {
    /// Target folder on the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Make the uploaded file publicly readable.
    pub public: bool,
    /// Arbitrary metadata stored with the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Progress report from an upload transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// 0–100.
    pub percentage: f64,
    pub bytes_uploaded: u64,
    pub bytes_total: u64,
}

impl TransferProgress {
    pub fn from_bytes(bytes_uploaded: u64, bytes_total: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let percentage = if bytes_total == 0 {
            100.0
        } else {
            bytes_uploaded as f64 / bytes_total as f64 * 100.0
        };
        Self {
            percentage,
            bytes_uploaded,
            bytes_total,
        }
    }
}
