use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::sdk::{CallOptions, ChatEvent, ChatSocket, ChatSocketOptions};
use crate::store::Store;

/// Chat rooms and message history over the request/response API.
#[derive(Debug, Clone)]
pub struct Chat {
    store: Store,
}

impl Chat {
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    #[instrument(skip_all)]
    pub async fn create_room(&self, room: &Value, options: CallOptions) -> Result<Value> {
        self.store.sdk()?.chat().create_room(room, options).await
    }

    pub async fn list_rooms(&self, options: CallOptions) -> Result<Value> {
        self.store.sdk()?.chat().list_rooms(options).await
    }

    #[instrument(skip(self, message, options))]
    pub async fn send_message(
        &self,
        room_id: &str,
        message: &Value,
        options: CallOptions,
    ) -> Result<Value> {
        self.store
            .sdk()?
            .chat()
            .send_message(room_id, message, options)
            .await
    }

    pub async fn list_messages(
        &self,
        room_id: &str,
        query: &Value,
        options: CallOptions,
    ) -> Result<Value> {
        self.store
            .sdk()?
            .chat()
            .list_messages(room_id, query, options)
            .await
    }

    #[instrument(skip(self, options))]
    pub async fn delete_message(
        &self,
        room_id: &str,
        message_id: &str,
        options: CallOptions,
    ) -> Result<Value> {
        self.store
            .sdk()?
            .chat()
            .delete_message(room_id, message_id, options)
            .await
    }
}

/// A realtime chat connection opened through the store's SDK.
#[derive(Debug)]
pub struct ChatWebSocket {
    socket: Box<dyn ChatSocket>,
    options: ChatSocketOptions,
}

impl ChatWebSocket {
    /// Open a connection; fails with `NotInitialized` while the SDK is absent.
    #[instrument(skip(store))]
    pub async fn connect(store: &Store, options: ChatSocketOptions) -> Result<Self> {
        let sdk = store.sdk()?;
        let socket = sdk.chat_websocket(options.clone()).await?;
        debug!(name: "chat.socket.opened", "Chat socket opened");
        Ok(Self { socket, options })
    }

    pub fn options(&self) -> &ChatSocketOptions {
        &self.options
    }

    pub async fn send(&mut self, event: ChatEvent) -> Result<()> {
        self.socket.send(event).await
    }

    /// Send a text message to `room_id`.
    pub async fn send_text(&mut self, room_id: &str, text: &str) -> Result<()> {
        self.socket.send(ChatEvent::message(room_id, text)).await
    }

    /// Next inbound event, `None` once closed.
    pub async fn next(&mut self) -> Option<Result<ChatEvent>> {
        self.socket.next().await
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close().await
    }
}
