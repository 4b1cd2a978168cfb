use std::time::Duration;

use serde_json::Value as JsonValue;
use strum::{EnumDiscriminants, IntoStaticStr};
use thiserror::Error;

use crate::types::ErrorDetails;

pub type Result<T, E = RpcError> = std::result::Result<T, E>;

/// Boxed error type used to carry the underlying cause of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a JSON-RPC call made through this crate can fail.
///
/// Transports classify their failures into one of these variants before returning, so callers
/// never see a raw I/O, HTTP or serde error.  The fieldless [`RpcErrorKind`] is available via
/// [`RpcError::kind`] for cases where only the classification matters.
#[derive(Debug, Error, EnumDiscriminants)]
#[strum_discriminants(name(RpcErrorKind), derive(IntoStaticStr, strum::Display, Hash))]
pub enum RpcError {
    /// The remote peer answered with a JSON-RPC error object.
    #[error("Method '{method}' failed with JSON-RPC error {code}: {message}",
        code = .error.code.code(),
        message = .error.message
    )]
    Protocol { method: String, error: ErrorDetails },

    /// The call succeeded but the result could not be deserialized into the type the caller asked
    /// for.
    #[error("Invalid format found in RPC response to '{method}': expected {type_name}")]
    ResponseFormat {
        source: serde_json::Error,
        method: String,
        type_name: &'static str,
        result: JsonValue,
    },

    /// The response body was not a well-formed JSON-RPC response document.
    #[error("Couldn't deserialize to JSON: {original_text}")]
    Deserialization {
        source: Option<serde_json::Error>,
        original_text: String,
    },

    /// The configured connection timeout elapsed before the exchange completed.
    #[error("Rpc timeout after {} milliseconds", .timeout.as_millis())]
    ClientTimeout { timeout: Duration },

    /// Any other failure at the transport level.
    #[error("{message}")]
    ClientUnknown { message: String, source: BoxError },

    /// A local IPC endpoint could not be reached.
    #[error("Connection to '{endpoint}' is not available")]
    ConnectionNotAvailable {
        endpoint: String,
        source: std::io::Error,
    },

    /// The cancellation token supplied by the caller was triggered.
    #[error("Call was cancelled by the caller")]
    Cancelled,
}

impl RpcError {
    /// The classification of this error, without any of its payload.
    pub fn kind(&self) -> RpcErrorKind {
        self.into()
    }

    /// Whether a caller can reasonably try the same call again.
    ///
    /// Protocol errors are reported as non-retryable here, but the error details are available
    /// for callers (or interceptors) that know better for a particular server.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            RpcErrorKind::ClientTimeout | RpcErrorKind::ClientUnknown | RpcErrorKind::ConnectionNotAvailable
        )
    }

    /// Error details reported by the server, if this is a protocol error.
    pub fn error_details(&self) -> Option<&ErrorDetails> {
        match self {
            RpcError::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Build a [`RpcError::ClientUnknown`] wrapping `source`.
    pub fn unknown(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RpcError::ClientUnknown {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Build a [`RpcError::Deserialization`] from the raw bytes that failed to parse.
    pub fn deserialization(bytes: &[u8], source: impl Into<Option<serde_json::Error>>) -> Self {
        RpcError::Deserialization {
            source: source.into(),
            original_text: String::from_utf8_lossy(bytes).to_string(),
        }
    }
}
