//! JSON-RPC over a single persistent connection.
//!
//! Each request goes out as one message (a line of JSON terminated by `\n` on byte streams, a
//! text message on WebSockets), and the server answers each with a response ending in `\n`.
//! Nothing on the wire ties a response to its request other than order, so the transport lets
//! exactly one call use the connection at a time.  Callers queue on the gate in
//! FIFO order, and each holds it from before its request is written until its response has been
//! read in full.
//!
//! The connection is opened lazily by the first call.  It's only handed back for reuse once an
//! exchange has read its response in full.  After a failed exchange, or one that was abandoned
//! part way because the caller's future was dropped, it's gone and the next call opens a new one.
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rpclink_jsonrpc::{
    Deadline, RequestMessage, ResponseMessage, Result, RpcError, RpcLogger, SendContext, TracingLogger, Transport,
};
use tokio::sync::Mutex;

#[cfg(unix)]
use super::connector::UnixConnector;
use super::connector::{Channel, Connector, MESSAGE_DELIMITER, TcpConnector};
use super::websocket::WebSocketConnector;

/// Size of the buffer each read from the connection goes into.
pub const READ_BUFFER_SIZE: usize = 512;

/// Longest a single read may take when the caller didn't provide a cancellation token.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Persistent-socket transport over TCP
pub type TcpTransport = SocketTransport<TcpConnector>;

/// Persistent-socket transport over a Unix domain socket, for local IPC
#[cfg(unix)]
pub type IpcTransport = SocketTransport<UnixConnector>;

/// Persistent-socket transport over a WebSocket
pub type WebSocketTransport = SocketTransport<WebSocketConnector>;

struct Connection<T> {
    channel: T,
    /// Cleared once the peer has closed its side
    open: bool,
}

pub struct SocketTransportBuilder<C> {
    connector: C,
    read_timeout: Duration,
    logger: Arc<dyn RpcLogger>,
}

impl<C: Connector> SocketTransportBuilder<C> {
    /// Override [`DEFAULT_READ_TIMEOUT`]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RpcLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> SocketTransport<C> {
        SocketTransport {
            connector: self.connector,
            read_timeout: self.read_timeout,
            gate: Mutex::new(None),
            logger: self.logger,
        }
    }
}

/// [`Transport`] that sends every call over one lazily-opened connection, one call at a time.
pub struct SocketTransport<C: Connector> {
    connector: C,
    read_timeout: Duration,
    /// The gate.  Whoever holds it owns the idle connection, if there is one.
    gate: Mutex<Option<Connection<C::Channel>>>,
    logger: Arc<dyn RpcLogger>,
}

impl<C: Connector> SocketTransport<C> {
    pub fn builder(connector: C) -> SocketTransportBuilder<C> {
        SocketTransportBuilder {
            connector,
            read_timeout: DEFAULT_READ_TIMEOUT,
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn new(connector: C) -> Self {
        Self::builder(connector).build()
    }

    async fn exchange(&self, request: &RequestMessage, deadline: &Deadline) -> Result<ResponseMessage> {
        let payload = request.to_json()?;

        let mut slot = deadline.bound(self.gate.lock()).await?;
        self.logger.log_request(&payload);

        // Out of the slot until the response is read, so a failed or dropped call can't return it
        let mut connection = match slot.take() {
            Some(connection) if connection.open => connection,
            _ => self.connect(deadline).await?,
        };

        let result = self.exchange_on(&mut connection, &payload, deadline).await;

        match &result {
            Ok(_) if connection.open => *slot = Some(connection),
            Ok(_) => {}
            Err(_) => {
                tracing::debug!(endpoint = %self.connector.endpoint(), "Discarding connection after failed call");
            }
        }

        result
    }

    /// One request/response exchange.  Must only be called while holding the gate.
    async fn exchange_on(
        &self,
        connection: &mut Connection<C::Channel>,
        payload: &str,
        deadline: &Deadline,
    ) -> Result<ResponseMessage> {
        deadline
            .bound(connection.channel.send_request(payload))
            .await?
            .map_err(|e| RpcError::unknown("Error writing request to connection", e))?;

        // A caller that brought its own token decides alone how long to wait
        let chunk_timeout = (!deadline.is_caller_provided()).then_some(self.read_timeout);
        let frame = deadline.bound(read_frame(connection, chunk_timeout)).await??;

        ResponseMessage::from_slice(&frame)
    }

    async fn connect(&self, deadline: &Deadline) -> Result<Connection<C::Channel>> {
        tracing::debug!(endpoint = %self.connector.endpoint(), "Opening connection");
        let channel = deadline.bound(self.connector.connect()).await??;
        Ok(Connection { channel, open: true })
    }
}

#[async_trait]
impl<C: Connector> Transport for SocketTransport<C> {
    fn remote_peer(&self) -> Cow<'static, str> {
        self.connector.endpoint()
    }

    async fn send(&self, request: &RequestMessage, context: &SendContext) -> Result<ResponseMessage> {
        let result = self.exchange(request, &context.deadline).await;

        match &result {
            Ok(response) => self.logger.log_response(response),
            Err(e) => self.logger.log_exception(e),
        }

        result
    }
}

/// Read one response frame.
///
/// Reads go into a [`READ_BUFFER_SIZE`] buffer and accumulate until a read ends with the
/// delimiter.  The server is expected to write each response with its delimiter last, so a
/// delimiter in the middle of a read doesn't end the frame.  EOF ends the frame too, and marks the
/// connection closed.
async fn read_frame<T: Channel>(
    connection: &mut Connection<T>,
    chunk_timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let mut frame = Vec::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        let read = connection.channel.read_chunk(&mut buffer);
        let bytes_read = match chunk_timeout {
            Some(timeout) => tokio::time::timeout(timeout, read)
                .await
                .map_err(|_| RpcError::ClientTimeout { timeout })?,
            None => read.await,
        }
        .map_err(|e| RpcError::unknown("Error reading response from connection", e))?;

        if bytes_read == 0 {
            connection.open = false;
            break;
        }

        frame.extend_from_slice(&buffer[..bytes_read]);
        if buffer[bytes_read - 1] == MESSAGE_DELIMITER {
            break;
        }
    }

    if frame.is_empty() {
        return Err(RpcError::deserialization(&frame, None));
    }

    tracing::trace!(len = frame.len(), "Read response frame");
    Ok(frame)
}
