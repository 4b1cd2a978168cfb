//! In this crate, the concept of a "transport" abstracts away the details of how a JSON-RPC
//! request gets to the remote server and how its response comes back.
//!
//! At this level a transport is very simply an async function from a [`types::RequestMessage`]
//! to a [`types::ResponseMessage`].  Everything above it (interceptors, protocol error handling,
//! typed results) is the same no matter how the bytes move.  Concrete transports over HTTP,
//! TCP and local IPC live in the `rpclink-client` crate.
use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::deadline::Deadline;
use crate::{Result, types};

/// Per-invocation inputs to [`Transport::send`] other than the request itself.
#[derive(Clone, Debug)]
pub struct SendContext {
    /// Transport-specific sub-address for this call, such as an HTTP path relative to the base
    /// address.  Transports without such a notion ignore it.
    pub route: Option<String>,

    /// Bound for every suspension point of this invocation.
    pub deadline: Deadline,
}

/// A transport carries one JSON-RPC request to the remote server and returns its response.
///
/// Implementations are expected to:
///
/// - Bound every suspension point (connecting, writing, reading, waiting for exclusive access)
///   by [`SendContext::deadline`].
/// - Classify every failure into a [`crate::RpcError`] variant before returning it.  A response
///   that carries a JSON-RPC error object is *not* a transport failure; it's returned as `Ok` and
///   unwrapped by the caller.
/// - Not retry anything.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Transport-specific identifier of the remote peer, useful for logging and debugging.
    fn remote_peer(&self) -> Cow<'static, str>;

    /// Send `request` and wait for its response.
    async fn send(&self, request: &types::RequestMessage, context: &SendContext) -> Result<types::ResponseMessage>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn remote_peer(&self) -> Cow<'static, str> {
        (**self).remote_peer()
    }

    async fn send(&self, request: &types::RequestMessage, context: &SendContext) -> Result<types::ResponseMessage> {
        (**self).send(request, context).await
    }
}
