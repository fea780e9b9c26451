//! WebSocket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomwire_core::error::{ChannelError, Result};

use super::{Connector, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production connector: dials `ws://` / `wss://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport> {
        let (stream, _resp) = connect_async(url)
            .await
            .map_err(|e| ChannelError::ConnectionError(e.to_string()))?;
        let (tx, rx) = stream.split();
        Ok(WsTransport { tx, rx })
    }
}

pub struct WsTransport {
    tx: SplitSink<WsStream, Message>,
    rx: SplitStream<WsStream>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.tx
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::ConnectionError(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.rx.next().await? {
                Ok(Message::Text(s)) => return Some(Ok(s)),
                // Protocol-level pings are answered here so the session loop
                // only ever sees application frames.
                Ok(Message::Ping(payload)) => {
                    if self.tx.send(Message::Pong(payload)).await.is_err() {
                        return None;
                    }
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Binary(_)) => {
                    tracing::debug!("ignoring binary frame on text channel");
                }
                Ok(Message::Close(_)) => return None,
                Err(e) => {
                    // The wire contract is log-then-close: surface the error
                    // once, then report the stream as closed.
                    tracing::warn!(error = %e, "websocket read error");
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.tx
            .send(Message::Close(None))
            .await
            .map_err(|e| ChannelError::ConnectionError(e.to_string()))
    }
}
