//! Interceptors are the middleware hook of the [`crate::Client`].
//!
//! When a client has an interceptor, every call is handed to it together with [`Next`], the
//! not-yet-executed send operation.  The interceptor decides whether to run it, how many times,
//! and with what arguments.  That's enough to build retries, re-authentication, request rewriting
//! or canned responses outside of this crate; none of those policies are built in.
//!
//! Only one interceptor is installed per client.  Interceptors that want to compose others do so
//! themselves.
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::deadline::Deadline;
use crate::transport::{SendContext, Transport};
use crate::types::{JsonValue, RequestMessage, RpcRequest};
use crate::Result;

/// Everything that describes a single call, as seen by an [`Interceptor`].
#[derive(Clone, Debug)]
pub struct Invocation {
    pub request: RpcRequest,

    /// Transport-specific route, see [`SendContext::route`]
    pub route: Option<String>,

    /// Cancellation signal supplied by the caller.  When absent, each run of the send operation
    /// gets a fresh deadline from the client's configured connection timeout.
    pub cancellation: Option<CancellationToken>,
}

impl Invocation {
    pub fn new(request: RpcRequest) -> Self {
        Self {
            request,
            route: None,
            cancellation: None,
        }
    }
}

/// Middleware wrapped around the send operation of a [`crate::Client`].
///
/// The result is the raw JSON `result` of the response.  Deserializing it into the type the
/// caller asked for happens after the interceptor returns.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, invocation: Invocation, next: Next<'_>) -> Result<JsonValue>;
}

/// The send operation handed to an [`Interceptor`].
///
/// This is cheap to copy, and [`Next::run`] can be called any number of times.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    connection_timeout: Duration,
}

impl<'a> Next<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, connection_timeout: Duration) -> Self {
        Self {
            transport,
            connection_timeout,
        }
    }

    /// Perform one exchange with the transport and unwrap the response.
    ///
    /// Fails with [`crate::RpcError::Protocol`] if the server answered with an error object, or
    /// with whatever error the transport reported.
    pub async fn run(&self, invocation: Invocation) -> Result<JsonValue> {
        let Invocation {
            request,
            route,
            cancellation,
        } = invocation;

        let message = RequestMessage::from(&request);
        let context = SendContext {
            route,
            deadline: Deadline::effective(cancellation, self.connection_timeout),
        };

        let response = self.transport.send(&message, &context).await?;

        if response.id != message.id {
            // Responses are paired with requests by ordering, not by id, so this is only worth a
            // warning
            tracing::warn!(
                request_id = %message.id,
                response_id = %response.id,
                method = %message.method,
                "Response id does not match request id"
            );
        }

        response.into_result(&message.method)
    }
}
