//! Realtime chat over a WebSocket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::Inner;
use crate::error::{Error, Result};
use crate::sdk::{ChatEvent, ChatSocket, ChatSocketOptions};

pub(super) async fn connect(
    inner: &Inner,
    options: ChatSocketOptions,
) -> Result<Box<dyn ChatSocket>> {
    let mut url = inner.url(&["chat", "ws"])?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|()| Error::InvalidRequest(format!("cannot use {scheme} for {url}")))?;
    if let Some(room) = &options.room_id {
        url.query_pairs_mut().append_pair("room", room);
    }

    let mut request = url.as_str().into_client_request()?;
    if let Some(auth) = inner.authorization(options.auth) {
        let value = HeaderValue::from_str(&auth)
            .map_err(|e| Error::InvalidRequest(format!("invalid authorization header: {e}")))?;
        request.headers_mut().insert("Authorization", value);
    }

    let (stream, _response) = connect_async(request).await?;
    debug!(name: "chat.socket.connected", room = ?options.room_id, "Chat socket connected");
    Ok(Box::new(HttpChatSocket { stream }))
}

struct HttpChatSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for HttpChatSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatSocket").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatSocket for HttpChatSocket {
    async fn send(&mut self, event: ChatEvent) -> Result<()> {
        let text = serde_json::to_string(&event)?;
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn next(&mut self) -> Option<Result<ChatEvent>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(Error::from));
                }
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite; binary frames are not part of the protocol.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
