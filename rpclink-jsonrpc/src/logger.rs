//! Hook for observing the raw traffic of a transport.
//!
//! Transports report every outbound request, every parsed inbound response, and every error they
//! return through an [`RpcLogger`].  By default that's [`TracingLogger`], which turns them into
//! `tracing` events.
use crate::{RpcError, types};

/// Sink for request, response and error events emitted by transports.
///
/// Logging is best-effort: none of these methods can fail, and implementations must not panic,
/// since they are called in the middle of a call.
pub trait RpcLogger: Send + Sync + 'static {
    /// The JSON text of a request, exactly as it is about to be written to the transport
    fn log_request(&self, raw_json: &str);

    /// A response that was successfully parsed
    fn log_response(&self, response: &types::ResponseMessage);

    /// An error that is about to be returned by the transport
    fn log_exception(&self, error: &RpcError);
}

/// [`RpcLogger`] that emits `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl RpcLogger for TracingLogger {
    fn log_request(&self, raw_json: &str) {
        tracing::debug!(request = raw_json, "Sending JSON-RPC request");
    }

    fn log_response(&self, response: &types::ResponseMessage) {
        match &response.payload {
            types::ResponsePayload::Success(_) => {
                tracing::debug!(id = %response.id, "Received JSON-RPC success response");
            }
            types::ResponsePayload::Error(error) => {
                tracing::debug!(
                    id = %response.id,
                    code = error.error.code.code(),
                    message = %error.error.message,
                    "Received JSON-RPC error response"
                );
            }
        }
    }

    fn log_exception(&self, error: &RpcError) {
        tracing::error!(kind = %error.kind(), err = %error, "JSON-RPC transport error");
    }
}
