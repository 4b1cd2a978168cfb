//! WebSocket flavor of the persistent-socket transport.
//!
//! Each request is sent as a single text message.  Incoming messages are treated as one
//! continuous byte stream, so a response is still found the same way as on a plain socket: by
//! reading until a chunk ends with `\n`.  Servers are expected to terminate each response that way.
use std::borrow::Cow;
use std::future::Future;
use std::io;

use futures::{SinkExt, StreamExt};
use rpclink_jsonrpc::{Result, RpcError};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::connector::{Channel, Connector};

/// Connects to a `ws://` or `wss://` URL.
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl Connector for WebSocketConnector {
    type Channel = WebSocketChannel;

    fn endpoint(&self) -> Cow<'static, str> {
        self.url.to_string().into()
    }

    fn connect(&self) -> impl Future<Output = Result<Self::Channel>> + Send + '_ {
        async move {
            let (socket, response) = tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| RpcError::unknown(format!("Error connecting to '{}'", self.url), e))?;
            tracing::debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");

            Ok(WebSocketChannel::new(socket))
        }
    }
}

/// An open WebSocket, with whatever part of the last message hasn't been read yet.
pub struct WebSocketChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: Vec<u8>,
}

impl WebSocketChannel {
    fn new(socket: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self {
            socket,
            pending: Vec::new(),
        }
    }
}

impl Channel for WebSocketChannel {
    fn send_request<'a>(&'a mut self, payload: &'a str) -> impl Future<Output = io::Result<()>> + Send + 'a {
        async move {
            self.socket
                .send(Message::text(payload.to_string()))
                .await
                .map_err(io::Error::other)
        }
    }

    fn read_chunk<'a>(&'a mut self, buf: &'a mut [u8]) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        async move {
            while self.pending.is_empty() {
                match self.socket.next().await {
                    Some(Ok(Message::Text(text))) => self.pending.extend_from_slice(text.as_bytes()),
                    Some(Ok(Message::Binary(data))) => self.pending.extend_from_slice(&data),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "Server closed the WebSocket");
                        return Ok(0);
                    }
                    // Pings are answered by the socket itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(io::Error::other(e)),
                    None => return Ok(0),
                }
            }

            let len = self.pending.len().min(buf.len());
            buf[..len].copy_from_slice(&self.pending[..len]);
            self.pending.drain(..len);
            Ok(len)
        }
    }
}
