//! REST implementation of the SDK boundary.
//!
//! Every endpoint lives under `{api_url}/v1/apps/{app}/`. Successful responses
//! are JSON envelopes of the form `{ "data": ... }`; the `data` member is
//! returned unless the call asked for the raw envelope.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::UploadSettings;
use crate::error::{Error, Result};
use crate::sdk::{
    AuthApi, AuthMode, CallOptions, ChatApi, ChatSocket, ChatSocketOptions, CollectionApi,
    Credentials, PasswordChange, Registration, Sdk, SdkFactory, SdkParams, Session,
    UploadTransport, UserApi, UserRecord, WebhookApi, WebhookRequest,
};

mod socket;
mod upload;

pub use upload::HttpUploadTransport;

/// HTTP client for the platform API.
///
/// # Example
///
/// ```rust,no_run
/// use cloud_hooks::sdk::{Credentials, CallOptions, Sdk, SdkParams};
/// use cloud_hooks::sdk::http::HttpSdk;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sdk = HttpSdk::new(SdkParams {
///     environment: "production".into(),
///     app_id: "my-app".into(),
///     api_url: "https://api.cloud-hooks.dev".into(),
///     token_type: "Bearer".into(),
///     api_token: None,
/// })?;
///
/// let credentials = Credentials { email: "ada@example.com".into(), password: "hunter2".into() };
/// let session = sdk.auth().login(&credentials, CallOptions::default()).await?;
/// println!("signed in as {}", session.user.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpSdk {
    inner: Arc<Inner>,
    auth: AuthClient,
    user: UserClient,
    chat: ChatClient,
    webhook: WebhookClient,
    uploader: Arc<HttpUploadTransport>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    base_url: Url,
    http: reqwest::Client,
    params: SdkParams,
    upload: UploadSettings,
    session_token: RwLock<Option<String>>,
    refresh_token: RwLock<Option<String>>,
}

impl HttpSdk {
    /// Create a new client with default upload settings.
    pub fn new(params: SdkParams) -> Result<Self> {
        Self::with_settings(params, reqwest::Client::new(), UploadSettings::default())
    }

    /// Create a new client with a custom reqwest client and upload settings.
    pub fn with_settings(
        params: SdkParams,
        http: reqwest::Client,
        upload: UploadSettings,
    ) -> Result<Self> {
        let mut base_url = Url::parse(&params.api_url)?;
        base_url
            .path_segments_mut()
            .map_err(|()| Error::InvalidRequest(format!("{} cannot carry a path", params.api_url)))?
            .pop_if_empty()
            .extend(["v1", "apps", params.app_id.as_str(), ""]);
        let inner = Arc::new(Inner {
            base_url,
            http,
            params,
            upload,
            session_token: RwLock::new(None),
            refresh_token: RwLock::new(None),
        });
        Ok(Self {
            auth: AuthClient(Arc::clone(&inner)),
            user: UserClient(Arc::clone(&inner)),
            chat: ChatClient(Arc::clone(&inner)),
            webhook: WebhookClient(Arc::clone(&inner)),
            uploader: Arc::new(HttpUploadTransport::new(Arc::clone(&inner))),
            inner,
        })
    }

    /// Get the base URL all endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Current session token, if signed in.
    pub fn session_token(&self) -> Option<String> {
        self.inner.session_token()
    }
}

#[async_trait]
impl Sdk for HttpSdk {
    fn auth(&self) -> &dyn AuthApi {
        &self.auth
    }

    fn user(&self) -> &dyn UserApi {
        &self.user
    }

    fn database(&self, collection_id: &str) -> Box<dyn CollectionApi + '_> {
        Box::new(CollectionClient {
            inner: &self.inner,
            collection_id: collection_id.to_string(),
        })
    }

    fn chat(&self) -> &dyn ChatApi {
        &self.chat
    }

    fn webhook(&self) -> &dyn WebhookApi {
        &self.webhook
    }

    fn uploader(&self) -> Arc<dyn UploadTransport> {
        Arc::clone(&self.uploader) as Arc<dyn UploadTransport>
    }

    async fn chat_websocket(&self, options: ChatSocketOptions) -> Result<Box<dyn ChatSocket>> {
        socket::connect(&self.inner, options).await
    }
}

/// Builds [`HttpSdk`] handles for the provider.
#[derive(Debug, Clone, Default)]
pub struct HttpSdkFactory {
    http: reqwest::Client,
    upload: UploadSettings,
}

impl HttpSdkFactory {
    pub fn new(upload: UploadSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload,
        }
    }
}

#[async_trait]
impl SdkFactory for HttpSdkFactory {
    async fn create(&self, params: &SdkParams) -> Result<Arc<dyn Sdk>> {
        let sdk = HttpSdk::with_settings(params.clone(), self.http.clone(), self.upload.clone())?;
        Ok(Arc::new(sdk))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

impl Inner {
    /// Resolve `segments` under the app-scoped base. Each segment is
    /// percent-encoded, so ids cannot add path levels or a query.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidRequest(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn session_token(&self) -> Option<String> {
        self.session_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: &Session) {
        *self
            .session_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session.token.clone());
        if let Some(refresh) = &session.refresh_token {
            *self
                .refresh_token
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(refresh.clone());
        }
    }

    fn clear_session(&self) {
        *self
            .session_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        *self
            .refresh_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Value of the `Authorization` header for the given override.
    fn authorization(&self, mode: Option<AuthMode>) -> Option<String> {
        let token = match mode {
            Some(AuthMode::Anonymous) => None,
            Some(AuthMode::Api) => self.params.api_token.clone(),
            Some(AuthMode::User) => self.session_token(),
            None => self
                .session_token()
                .or_else(|| self.params.api_token.clone()),
        }?;
        Some(format!("{} {}", self.params.token_type, token))
    }

    fn request(
        &self,
        method: Method,
        path: &[&str],
        options: CallOptions,
    ) -> Result<RequestBuilder> {
        let mut builder = self
            .http
            .request(method, self.url(path)?)
            .header("X-Environment", &self.params.environment);
        if let Some(auth) = self.authorization(options.auth) {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth);
        }
        Ok(builder)
    }

    async fn send(builder: RequestBuilder, options: CallOptions) -> Result<serde_json::Value> {
        let response = builder.send().await?;
        let envelope = Self::handle_response(response).await?;
        Ok(unwrap_envelope(envelope, options.raw_response))
    }

    async fn send_typed<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let envelope = Self::handle_response(response).await?;
        Ok(serde_json::from_value(unwrap_envelope(envelope, false))?)
    }

    async fn handle_response(response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            Ok(serde_json::from_str(&text)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn unwrap_envelope(envelope: serde_json::Value, raw: bool) -> serde_json::Value {
    if raw {
        return envelope;
    }
    match envelope {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

// =============================================================================
// Auth API
// =============================================================================

#[derive(Debug, Clone)]
struct AuthClient(Arc<Inner>);

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, credentials: &Credentials, options: CallOptions) -> Result<Session> {
        let builder = self
            .0
            .request(Method::POST, &["auth", "login"], options)?
            .json(credentials);
        let session: Session = Inner::send_typed(builder).await?;
        self.0.store_session(&session);
        Ok(session)
    }

    async fn register(&self, registration: &Registration, options: CallOptions) -> Result<Session> {
        let builder = self
            .0
            .request(Method::POST, &["auth", "register"], options)?
            .json(registration);
        let session: Session = Inner::send_typed(builder).await?;
        self.0.store_session(&session);
        Ok(session)
    }

    async fn authorize(&self, options: CallOptions) -> Result<Option<UserRecord>> {
        if self.0.authorization(options.auth).is_none() {
            return Ok(None);
        }
        let builder = self.0.request(Method::GET, &["auth", "me"], options)?;
        match Inner::send_typed(builder).await {
            Ok(user) => Ok(Some(user)),
            Err(Error::Api { status: 401, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn logout(&self, options: CallOptions) -> Result<()> {
        let builder = self.0.request(Method::POST, &["auth", "logout"], options)?;
        let result = Inner::send(builder, options).await;
        self.0.clear_session();
        result.map(|_| ())
    }

    async fn refresh_token(&self, options: CallOptions) -> Result<Session> {
        let refresh = self
            .0
            .refresh_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::InvalidRequest("no refresh token stored".to_string()))?;
        let builder = self
            .0
            .request(Method::POST, &["auth", "refresh"], options)?
            .json(&serde_json::json!({ "refresh_token": refresh }));
        let session: Session = Inner::send_typed(builder).await?;
        self.0.store_session(&session);
        Ok(session)
    }

    async fn forgot_password(&self, email: &str, options: CallOptions) -> Result<()> {
        let builder = self
            .0
            .request(Method::POST, &["auth", "forgot-password"], options)?
            .json(&serde_json::json!({ "email": email }));
        Inner::send(builder, options).await.map(|_| ())
    }
}

// =============================================================================
// User API
// =============================================================================

#[derive(Debug, Clone)]
struct UserClient(Arc<Inner>);

#[async_trait]
impl UserApi for UserClient {
    async fn update_profile(
        &self,
        changes: &serde_json::Value,
        options: CallOptions,
    ) -> Result<UserRecord> {
        let builder = self
            .0
            .request(Method::PATCH, &["users", "me"], options)?
            .json(changes);
        Inner::send_typed(builder).await
    }

    async fn change_password(&self, change: &PasswordChange, options: CallOptions) -> Result<()> {
        let builder = self
            .0
            .request(Method::POST, &["users", "me", "password"], options)?
            .json(change);
        Inner::send(builder, options).await.map(|_| ())
    }

    async fn get(&self, user_id: &str, options: CallOptions) -> Result<UserRecord> {
        let builder = self
            .0
            .request(Method::GET, &["users", user_id], options)?;
        Inner::send_typed(builder).await
    }

    async fn list(
        &self,
        query: &serde_json::Value,
        options: CallOptions,
    ) -> Result<Vec<UserRecord>> {
        let builder = self
            .0
            .request(Method::POST, &["users", "query"], options)?
            .json(query);
        Inner::send_typed(builder).await
    }

    async fn delete(&self, user_id: &str, options: CallOptions) -> Result<()> {
        let builder = self
            .0
            .request(Method::DELETE, &["users", user_id], options)?;
        Inner::send(builder, options).await.map(|_| ())
    }
}

// =============================================================================
// Database API
// =============================================================================

#[derive(Debug)]
struct CollectionClient<'a> {
    inner: &'a Inner,
    collection_id: String,
}

impl CollectionClient<'_> {
    fn path<'s>(&'s self, rest: &[&'s str]) -> Vec<&'s str> {
        let mut path = vec!["database", self.collection_id.as_str()];
        path.extend_from_slice(rest);
        path
    }
}

#[async_trait]
impl CollectionApi for CollectionClient<'_> {
    async fn find(
        &self,
        query: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .inner
            .request(Method::POST, &self.path(&["query"]), options)?
            .json(query);
        Inner::send(builder, options).await
    }

    async fn find_one(&self, id: &str, options: CallOptions) -> Result<serde_json::Value> {
        let builder = self.inner.request(Method::GET, &self.path(&[id]), options)?;
        Inner::send(builder, options).await
    }

    async fn insert(
        &self,
        doc: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .inner
            .request(Method::POST, &self.path(&[]), options)?
            .json(doc);
        Inner::send(builder, options).await
    }

    async fn update(
        &self,
        id: &str,
        doc: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .inner
            .request(Method::PATCH, &self.path(&[id]), options)?
            .json(doc);
        Inner::send(builder, options).await
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<serde_json::Value> {
        let builder = self.inner.request(Method::DELETE, &self.path(&[id]), options)?;
        Inner::send(builder, options).await
    }

    async fn count(&self, query: &serde_json::Value, options: CallOptions) -> Result<u64> {
        #[derive(serde::Deserialize)]
        struct Count {
            count: u64,
        }

        let builder = self
            .inner
            .request(Method::POST, &self.path(&["count"]), options)?
            .json(query);
        let count: Count = Inner::send_typed(builder).await?;
        Ok(count.count)
    }
}

// =============================================================================
// Chat API
// =============================================================================

#[derive(Debug, Clone)]
struct ChatClient(Arc<Inner>);

#[async_trait]
impl ChatApi for ChatClient {
    async fn create_room(
        &self,
        room: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .0
            .request(Method::POST, &["chat", "rooms"], options)?
            .json(room);
        Inner::send(builder, options).await
    }

    async fn list_rooms(&self, options: CallOptions) -> Result<serde_json::Value> {
        let builder = self.0.request(Method::GET, &["chat", "rooms"], options)?;
        Inner::send(builder, options).await
    }

    async fn send_message(
        &self,
        room_id: &str,
        message: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .0
            .request(
                Method::POST,
                &["chat", "rooms", room_id, "messages"],
                options,
            )?
            .json(message);
        Inner::send(builder, options).await
    }

    async fn list_messages(
        &self,
        room_id: &str,
        query: &serde_json::Value,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self
            .0
            .request(
                Method::POST,
                &["chat", "rooms", room_id, "messages", "query"],
                options,
            )?
            .json(query);
        Inner::send(builder, options).await
    }

    async fn delete_message(
        &self,
        room_id: &str,
        message_id: &str,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let builder = self.0.request(
            Method::DELETE,
            &["chat", "rooms", room_id, "messages", message_id],
            options,
        )?;
        Inner::send(builder, options).await
    }
}

// =============================================================================
// Webhook API
// =============================================================================

#[derive(Debug, Clone)]
struct WebhookClient(Arc<Inner>);

#[async_trait]
impl WebhookApi for WebhookClient {
    async fn call(
        &self,
        webhook_id: &str,
        request: WebhookRequest,
        options: CallOptions,
    ) -> Result<serde_json::Value> {
        let method = match request.method.as_deref() {
            Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("invalid method '{m}': {e}")))?,
            None => Method::POST,
        };
        let mut builder = self
            .0
            .request(method, &["webhooks", webhook_id], options)?;
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Inner::send(builder, options).await
    }
}
