//! Transport-agnostic core of a JSON-RPC 2.0 client.
//!
//! This crate holds everything about making a call that doesn't depend on how bytes reach the
//! server: the wire types, the [`Client`] that callers use, the [`Interceptor`] hook, the
//! [`Deadline`] that bounds each call, and the [`RpcError`] taxonomy every failure is classified
//! into.  Concrete transports implement [`Transport`]; the ones for HTTP and persistent sockets
//! live in `rpclink-client`.
//!
//! Only the client role is implemented.  Parameters are always positional, and each call is a
//! single request/response exchange; batches and notifications are not supported.

/// Re-export the exact async-trait macro we use, for compatibility
#[doc(hidden)]
pub use async_trait::async_trait;

mod client;
mod deadline;
mod error;
mod interceptor;
mod logger;
#[cfg(test)]
pub mod testing;
mod transport;
mod types;

pub use client::{CallOptions, Client, ClientBuilder};
pub use deadline::{Bounded, DEFAULT_CONNECTION_TIMEOUT, Deadline};
pub use error::{BoxError, Result, RpcError, RpcErrorKind};
pub use interceptor::{Interceptor, Invocation, Next};
pub use logger::{RpcLogger, TracingLogger};
pub use transport::{SendContext, Transport};
pub use types::{
    DEFAULT_REQUEST_ID, ErrorCode, ErrorDetails, ErrorResponse, Id, JsonValue, RequestMessage, ResponseMessage,
    ResponsePayload, RpcRequest, SuccessResponse, TwoPointZero,
};
pub use tokio_util::sync::CancellationToken;
