//! Declarative configuration for a [`Client`] and the transport behind it.
//!
//! ```yaml
//! connection_timeout: 10s
//! transport:
//!   kind: http
//!   base_url: https://rpc.example.com/v1/
//!   auth:
//!     scheme: bearer
//!     token: "..."
//! ```
#[cfg(unix)]
use std::path::PathBuf;
use std::time::Duration;

use rpclink_jsonrpc::{Client, DEFAULT_CONNECTION_TIMEOUT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;
#[cfg(unix)]
use crate::transport::UnixConnector;
use crate::transport::{
    AuthHeader, DEFAULT_READ_TIMEOUT, HANDLE_REFRESH_INTERVAL, HttpTransport, SocketTransport, TcpConnector,
    WebSocketConnector,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Time allowed for each call when the caller doesn't pass its own cancellation token
    #[serde(default = "default_connection_timeout", with = "humantime_serde")]
    pub connection_timeout: Duration,

    pub transport: TransportConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Http {
        /// Address every request is posted to, or that per-call routes are resolved against
        base_url: Url,

        #[serde(default)]
        auth: Option<AuthHeader>,

        #[serde(default = "default_handle_refresh_interval", with = "humantime_serde")]
        handle_refresh_interval: Duration,
    },
    Tcp {
        /// `host:port` of the server
        endpoint: String,

        #[serde(default = "default_read_timeout", with = "humantime_serde")]
        read_timeout: Duration,
    },
    #[serde(rename = "websocket")]
    WebSocket {
        /// `ws://` or `wss://` URL of the server
        url: Url,

        #[serde(default = "default_read_timeout", with = "humantime_serde")]
        read_timeout: Duration,
    },
    #[cfg(unix)]
    Ipc {
        /// Path of the server's Unix domain socket
        path: PathBuf,

        #[serde(default = "default_read_timeout", with = "humantime_serde")]
        read_timeout: Duration,
    },
}

impl ClientConfig {
    /// Build the transport this configuration describes, and a client on top of it.
    pub fn build(&self) -> Result<Client> {
        let builder = match &self.transport {
            TransportConfig::Http {
                base_url,
                auth,
                handle_refresh_interval,
            } => {
                let mut transport =
                    HttpTransport::builder(base_url.clone()).with_handle_refresh_interval(*handle_refresh_interval);
                if let Some(auth) = auth {
                    transport = transport.with_auth(auth.clone());
                }
                Client::builder(transport.build()?)
            }
            TransportConfig::Tcp { endpoint, read_timeout } => Client::builder(
                SocketTransport::builder(TcpConnector::new(endpoint.clone()))
                    .with_read_timeout(*read_timeout)
                    .build(),
            ),
            TransportConfig::WebSocket { url, read_timeout } => Client::builder(
                SocketTransport::builder(WebSocketConnector::new(url.clone()))
                    .with_read_timeout(*read_timeout)
                    .build(),
            ),
            #[cfg(unix)]
            TransportConfig::Ipc { path, read_timeout } => Client::builder(
                SocketTransport::builder(UnixConnector::new(path.clone()))
                    .with_read_timeout(*read_timeout)
                    .build(),
            ),
        };

        tracing::debug!(peer = ?self.transport, "Built JSON-RPC client from configuration");
        Ok(builder.with_connection_timeout(self.connection_timeout).build())
    }
}

fn default_connection_timeout() -> Duration {
    DEFAULT_CONNECTION_TIMEOUT
}

fn default_handle_refresh_interval() -> Duration {
    HANDLE_REFRESH_INTERVAL
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}
