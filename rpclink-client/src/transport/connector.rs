//! Ways of opening the connection a [`super::SocketTransport`] talks over.
use std::borrow::Cow;
use std::future::Future;
use std::io;
#[cfg(unix)]
use std::path::PathBuf;

use rpclink_jsonrpc::{Result, RpcError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Byte that terminates every request written to, and every response read from, a stream.
pub(super) const MESSAGE_DELIMITER: u8 = b'\n';

/// Opens a new connection to a fixed endpoint.
///
/// The socket transport calls this lazily, on the first call and again after any failed call.
/// Failures must already be classified into an [`RpcError`].
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel;

    /// Human-readable description of where this connector connects to
    fn endpoint(&self) -> Cow<'static, str>;

    fn connect(&self) -> impl Future<Output = Result<Self::Channel>> + Send + '_;
}

/// An open connection to a JSON-RPC server.
///
/// Each request goes out whole in one `send_request`.  Responses come back through `read_chunk`
/// in whatever pieces the connection delivers them, and it's up to the caller to find where one
/// response ends.
pub trait Channel: Send + Unpin + 'static {
    fn send_request<'a>(&'a mut self, payload: &'a str) -> impl Future<Output = io::Result<()>> + Send + 'a;

    /// Read the next available bytes into `buf`, returning how many were read.  `0` means the peer
    /// closed the connection.
    fn read_chunk<'a>(&'a mut self, buf: &'a mut [u8]) -> impl Future<Output = io::Result<usize>> + Send + 'a;
}

/// [`Channel`] over a plain byte stream, with requests terminated by [`MESSAGE_DELIMITER`].
#[derive(Debug)]
pub struct LineStream<S> {
    stream: S,
}

impl<S> LineStream<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S> Channel for LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn send_request<'a>(&'a mut self, payload: &'a str) -> impl Future<Output = io::Result<()>> + Send + 'a {
        async move {
            self.stream.write_all(payload.as_bytes()).await?;
            self.stream.write_all(&[MESSAGE_DELIMITER]).await?;
            self.stream.flush().await
        }
    }

    fn read_chunk<'a>(&'a mut self, buf: &'a mut [u8]) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        self.stream.read(buf)
    }
}

/// Connects over TCP to a `host:port` address.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    type Channel = LineStream<TcpStream>;

    fn endpoint(&self) -> Cow<'static, str> {
        format!("tcp://{}", self.addr).into()
    }

    fn connect(&self) -> impl Future<Output = Result<Self::Channel>> + Send + '_ {
        async move {
            let stream = TcpStream::connect(self.addr.as_str())
                .await
                .map_err(|e| RpcError::unknown(format!("Error connecting to '{}'", self.addr), e))?;

            // Requests are small and each one is flushed explicitly
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(addr = %self.addr, err = %e, "Unable to set TCP_NODELAY");
            }

            Ok(LineStream::new(stream))
        }
    }
}

/// Connects to a local IPC endpoint over a Unix domain socket.
///
/// Unlike TCP, failing to connect here is reported as [`RpcError::ConnectionNotAvailable`], since
/// it almost always means the server process isn't running.
#[cfg(unix)]
#[derive(Clone, Debug)]
pub struct UnixConnector {
    path: PathBuf,
}

#[cfg(unix)]
impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(unix)]
impl Connector for UnixConnector {
    type Channel = LineStream<tokio::net::UnixStream>;

    fn endpoint(&self) -> Cow<'static, str> {
        format!("unix://{}", self.path.display()).into()
    }

    fn connect(&self) -> impl Future<Output = Result<Self::Channel>> + Send + '_ {
        async move {
            tokio::net::UnixStream::connect(&self.path)
                .await
                .map(LineStream::new)
                .map_err(|e| RpcError::ConnectionNotAvailable {
                    endpoint: self.path.display().to_string(),
                    source: e,
                })
        }
    }
}
