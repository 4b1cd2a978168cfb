//! Transports for reaching remote JSON-RPC servers.
//!
//! All of these provide an implementation of [`rpclink_jsonrpc::Transport`], so any of them can
//! back a [`rpclink_jsonrpc::Client`].

mod connector;
mod http;
mod socket;
mod websocket;

pub use connector::*;
pub use http::*;
pub use socket::*;
pub use websocket::*;
