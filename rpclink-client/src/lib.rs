//! Concrete transports and configuration for `rpclink` JSON-RPC clients.
//!
//! [`rpclink_jsonrpc`] knows how to make a call; this crate knows how to get it to a server:
//!
//! - [`HttpTransport`] posts each request to an HTTP endpoint, rotating its HTTP client
//!   periodically.
//! - [`SocketTransport`] keeps one connection open and sends calls over it one at a time, with
//!   [`TcpTransport`], [`WebSocketTransport`] and (on Unix) [`IpcTransport`] as the ready-made
//!   flavors.
//! - [`ClientConfig`] builds either of those, and a [`rpclink_jsonrpc::Client`] on top, from
//!   configuration.

mod config;
mod error;
#[cfg(test)]
pub mod testing;
mod transport;

pub use config::{ClientConfig, TransportConfig};
pub use error::{ClientError, Result};
pub use transport::*;
