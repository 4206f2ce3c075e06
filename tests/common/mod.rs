//! In-memory SDK and upload transport used by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use cloud_hooks::error::{Error, Result, UploadFailure};
use cloud_hooks::sdk::{
    AuthApi, CallOptions, ChatApi, ChatEvent, ChatSocket, ChatSocketOptions, CollectionApi,
    Credentials, FileHandle, PasswordChange, Registration, Sdk, SdkFactory, SdkParams, Session,
    TransferProgress, UploadListener, UploadOptions, UploadRegistration, UploadTransport,
    UserApi, UserRecord, WebhookApi, WebhookRequest,
};
use cloud_hooks::store::{Action, AppState, Store};

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        name: None,
        role: None,
        created_at: None,
        extra: serde_json::Map::new(),
    }
}

/// A store with `sdk` already published.
pub fn ready_store(sdk: Arc<MockSdk>) -> Store {
    let store = Store::new(AppState {
        app: "demo".to_string(),
        ..AppState::default()
    });
    store.dispatch(Action::SetSdkInstance(Some(sdk as Arc<dyn Sdk>)));
    store
}

// =============================================================================
// Upload transport
// =============================================================================

pub struct Registered {
    pub upload_id: String,
    pub file_name: String,
    pub options: UploadOptions,
    pub listener: Arc<dyn UploadListener>,
    pub abort: CancellationToken,
}

/// Transport whose uploads only progress when the test drives them.
#[derive(Default)]
pub struct MockTransport {
    registered: Mutex<Vec<Registered>>,
    refuse: Mutex<Vec<String>>,
    early_progress: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse to register files with this name.
    pub fn refuse(&self, file_name: &str) {
        self.refuse.lock().unwrap().push(file_name.to_string());
    }

    /// Report 50% progress for this file before `upload_file` returns.
    pub fn progress_before_return(&self, file_name: &str) {
        self.early_progress.lock().unwrap().push(file_name.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upload_id(&self, file_name: &str) -> String {
        self.with(file_name, |r| r.upload_id.clone())
    }

    pub fn options(&self, file_name: &str) -> UploadOptions {
        self.with(file_name, |r| r.options.clone())
    }

    pub fn abort_token(&self, file_name: &str) -> CancellationToken {
        self.with(file_name, |r| r.abort.clone())
    }

    pub fn progress(&self, file_name: &str, uploaded: u64, total: u64) {
        self.listener(file_name)
            .on_progress(TransferProgress::from_bytes(uploaded, total));
    }

    pub fn succeed(&self, file_name: &str) {
        self.listener(file_name).on_success(
            format!("file-{file_name}"),
            format!("https://cdn.example.com/{file_name}"),
        );
    }

    pub fn fail(&self, file_name: &str, message: &str) {
        self.listener(file_name)
            .on_error(UploadFailure::new(message).with_status(500));
    }

    fn listener(&self, file_name: &str) -> Arc<dyn UploadListener> {
        self.with(file_name, |r| Arc::clone(&r.listener))
    }

    // Most recent registration wins so resubmitted names address the new upload.
    fn with<T>(&self, file_name: &str, f: impl FnOnce(&Registered) -> T) -> T {
        let registered = self.registered.lock().unwrap();
        let entry = registered
            .iter()
            .rev()
            .find(|r| r.file_name == file_name)
            .unwrap_or_else(|| panic!("{file_name} was never registered"));
        f(entry)
    }
}

impl UploadTransport for MockTransport {
    fn upload_file(
        &self,
        file: FileHandle,
        options: &UploadOptions,
        listener: Arc<dyn UploadListener>,
    ) -> std::result::Result<UploadRegistration, UploadFailure> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.lock().unwrap().contains(&file.name) {
            return Err(UploadFailure::new(format!("{} refused", file.name)));
        }
        if self.early_progress.lock().unwrap().contains(&file.name) {
            listener.on_progress(TransferProgress::from_bytes(1, 2));
        }
        let upload_id = format!("up-{n}");
        let abort = CancellationToken::new();
        self.registered.lock().unwrap().push(Registered {
            upload_id: upload_id.clone(),
            file_name: file.name,
            options: options.clone(),
            listener,
            abort: abort.clone(),
        });
        Ok(UploadRegistration { upload_id, abort })
    }
}

// =============================================================================
// SDK
// =============================================================================

/// Records every call as `"<area>.<operation> <detail>"` and answers with
/// canned data.
#[derive(Debug, Default)]
pub struct MockSdk {
    pub transport: Arc<MockTransport>,
    calls: Mutex<Vec<String>>,
    options: Mutex<Vec<CallOptions>>,
    current_user: Mutex<Option<UserRecord>>,
    fail_authorize: AtomicBool,
}

impl MockSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Call options seen by the SDK, in call order.
    pub fn options(&self) -> Vec<CallOptions> {
        self.options.lock().unwrap().clone()
    }

    /// User `authorize` resolves to.
    pub fn set_current_user(&self, user: Option<UserRecord>) {
        *self.current_user.lock().unwrap() = user;
    }

    pub fn fail_authorize(&self) {
        self.fail_authorize.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>, options: CallOptions) {
        self.calls.lock().unwrap().push(call.into());
        self.options.lock().unwrap().push(options);
    }

    fn session(email: &str) -> Session {
        let id = email.split('@').next().unwrap_or(email);
        Session {
            token: format!("token-{id}"),
            refresh_token: Some(format!("refresh-{id}")),
            user: user(id),
        }
    }
}

#[async_trait]
impl Sdk for MockSdk {
    fn auth(&self) -> &dyn AuthApi {
        self
    }

    fn user(&self) -> &dyn UserApi {
        self
    }

    fn database(&self, collection_id: &str) -> Box<dyn CollectionApi + '_> {
        Box::new(MockCollection {
            sdk: self,
            id: collection_id.to_string(),
        })
    }

    fn chat(&self) -> &dyn ChatApi {
        self
    }

    fn webhook(&self) -> &dyn WebhookApi {
        self
    }

    fn uploader(&self) -> Arc<dyn UploadTransport> {
        Arc::clone(&self.transport) as Arc<dyn UploadTransport>
    }

    async fn chat_websocket(&self, options: ChatSocketOptions) -> Result<Box<dyn ChatSocket>> {
        self.record(
            format!("chat.socket {}", options.room_id.as_deref().unwrap_or("*")),
            CallOptions::default(),
        );
        Ok(Box::new(EchoSocket::default()))
    }
}

#[async_trait]
impl AuthApi for MockSdk {
    async fn login(&self, credentials: &Credentials, options: CallOptions) -> Result<Session> {
        self.record(format!("auth.login {}", credentials.email), options);
        if credentials.password.is_empty() {
            return Err(Error::Api {
                status: 401,
                message: "invalid credentials".to_string(),
            });
        }
        Ok(Self::session(&credentials.email))
    }

    async fn register(&self, registration: &Registration, options: CallOptions) -> Result<Session> {
        self.record(format!("auth.register {}", registration.email), options);
        Ok(Self::session(&registration.email))
    }

    async fn authorize(&self, options: CallOptions) -> Result<Option<UserRecord>> {
        self.record("auth.authorize", options);
        if self.fail_authorize.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.current_user.lock().unwrap().clone())
    }

    async fn logout(&self, options: CallOptions) -> Result<()> {
        self.record("auth.logout", options);
        Ok(())
    }

    async fn refresh_token(&self, options: CallOptions) -> Result<Session> {
        self.record("auth.refresh", options);
        Ok(Self::session("refreshed@example.com"))
    }

    async fn forgot_password(&self, email: &str, options: CallOptions) -> Result<()> {
        self.record(format!("auth.forgot_password {email}"), options);
        Ok(())
    }
}

#[async_trait]
impl UserApi for MockSdk {
    async fn update_profile(&self, changes: &Value, options: CallOptions) -> Result<UserRecord> {
        self.record("user.update_profile", options);
        let mut updated = user("ada");
        updated.name = changes["name"].as_str().map(str::to_string);
        Ok(updated)
    }

    async fn change_password(&self, _change: &PasswordChange, options: CallOptions) -> Result<()> {
        self.record("user.change_password", options);
        Ok(())
    }

    async fn get(&self, user_id: &str, options: CallOptions) -> Result<UserRecord> {
        self.record(format!("user.get {user_id}"), options);
        Ok(user(user_id))
    }

    async fn list(&self, _query: &Value, options: CallOptions) -> Result<Vec<UserRecord>> {
        self.record("user.list", options);
        Ok(vec![user("ada"), user("grace")])
    }

    async fn delete(&self, user_id: &str, options: CallOptions) -> Result<()> {
        self.record(format!("user.delete {user_id}"), options);
        Ok(())
    }
}

struct MockCollection<'a> {
    sdk: &'a MockSdk,
    id: String,
}

#[async_trait]
impl CollectionApi for MockCollection<'_> {
    async fn find(&self, query: &Value, options: CallOptions) -> Result<Value> {
        self.sdk.record(format!("db.find {}", self.id), options);
        Ok(json!([{ "query": query }]))
    }

    async fn find_one(&self, id: &str, options: CallOptions) -> Result<Value> {
        self.sdk.record(format!("db.find_one {}/{id}", self.id), options);
        Ok(json!({ "id": id }))
    }

    async fn insert(&self, doc: &Value, options: CallOptions) -> Result<Value> {
        self.sdk.record(format!("db.insert {}", self.id), options);
        Ok(doc.clone())
    }

    async fn update(&self, id: &str, doc: &Value, options: CallOptions) -> Result<Value> {
        self.sdk.record(format!("db.update {}/{id}", self.id), options);
        Ok(doc.clone())
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<Value> {
        self.sdk.record(format!("db.delete {}/{id}", self.id), options);
        Ok(json!({ "deleted": id }))
    }

    async fn count(&self, _query: &Value, options: CallOptions) -> Result<u64> {
        self.sdk.record(format!("db.count {}", self.id), options);
        Ok(3)
    }
}

#[async_trait]
impl ChatApi for MockSdk {
    async fn create_room(&self, room: &Value, options: CallOptions) -> Result<Value> {
        self.record("chat.create_room", options);
        Ok(room.clone())
    }

    async fn list_rooms(&self, options: CallOptions) -> Result<Value> {
        self.record("chat.list_rooms", options);
        Ok(json!([]))
    }

    async fn send_message(&self, room_id: &str, message: &Value, options: CallOptions) -> Result<Value> {
        self.record(format!("chat.send_message {room_id}"), options);
        Ok(message.clone())
    }

    async fn list_messages(&self, room_id: &str, _query: &Value, options: CallOptions) -> Result<Value> {
        self.record(format!("chat.list_messages {room_id}"), options);
        Ok(json!([]))
    }

    async fn delete_message(
        &self,
        room_id: &str,
        message_id: &str,
        options: CallOptions,
    ) -> Result<Value> {
        self.record(format!("chat.delete_message {room_id}/{message_id}"), options);
        Ok(Value::Null)
    }
}

#[async_trait]
impl WebhookApi for MockSdk {
    async fn call(&self, webhook_id: &str, request: WebhookRequest, options: CallOptions) -> Result<Value> {
        self.record(format!("webhook.call {webhook_id}"), options);
        Ok(json!({
            "method": request.method.unwrap_or_else(|| "POST".to_string()),
            "body": request.body,
        }))
    }
}

/// Socket that hands back whatever was sent to it.
#[derive(Debug, Default)]
pub struct EchoSocket {
    queue: Vec<ChatEvent>,
    closed: bool,
}

#[async_trait]
impl ChatSocket for EchoSocket {
    async fn send(&mut self, event: ChatEvent) -> Result<()> {
        self.queue.push(event);
        Ok(())
    }

    async fn next(&mut self) -> Option<Result<ChatEvent>> {
        if self.closed || self.queue.is_empty() {
            return None;
        }
        Some(Ok(self.queue.remove(0)))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// Factory
// =============================================================================

#[derive(Debug, Default)]
pub struct MockFactory {
    fail: AtomicBool,
    created: Mutex<Vec<SdkParams>>,
    last: Mutex<Option<Arc<MockSdk>>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let factory = Self::default();
        factory.fail.store(true, Ordering::SeqCst);
        Arc::new(factory)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<SdkParams> {
        self.created.lock().unwrap().clone()
    }

    pub fn last_sdk(&self) -> Option<Arc<MockSdk>> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl SdkFactory for MockFactory {
    async fn create(&self, params: &SdkParams) -> Result<Arc<dyn Sdk>> {
        self.created.lock().unwrap().push(params.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::InvalidRequest("factory refused".to_string()));
        }
        let sdk = MockSdk::new();
        *self.last.lock().unwrap() = Some(Arc::clone(&sdk));
        Ok(sdk as Arc<dyn Sdk>)
    }
}
