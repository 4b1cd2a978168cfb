//! Rust struct definitions that ser/de to/from JSON-RPC messages.
//!
//! There are two layers here.  [`RpcRequest`] is what callers build: a method, its positional
//! parameters, and an id.  [`RequestMessage`] and [`ResponseMessage`] are the documents that
//! actually go over the wire, and are the only types transports need to know about.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, RpcError};
/// Re-export the basic protocol types from `jsonrpsee-types`.
///
/// No need to re-invent this wheel; the error code enum and the version marker are exactly what
/// we would declare ourselves.
pub use jsonrpsee_types::{error::ErrorCode, params::TwoPointZero};
pub use serde_json::Value as JsonValue;

/// Id used for requests whose caller didn't supply one.
///
/// Nothing in this crate matches responses to requests by id, so it is safe for every request to
/// share this id as long as calls on a single connection are not pipelined.
pub const DEFAULT_REQUEST_ID: Id = Id::Number(1);

/// Request Id
#[derive(Debug, PartialEq, Clone, Hash, Eq, Deserialize, Serialize, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
#[serde(untagged)]
pub enum Id {
    /// Null
    Null,
    /// Numeric id
    Number(u64),
    /// String id
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Null => f.write_str("null"),
            Id::Number(n) => write!(f, "{n}"),
            Id::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Id::Number(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

/// A method call as described by the caller, before it is encoded for the wire.
///
/// Once built the request can't be changed; interceptors that want to rewrite a call build a new
/// one.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    id: Id,
    method: String,
    params: Vec<JsonValue>,
}

impl RpcRequest {
    /// Create a request with the [`DEFAULT_REQUEST_ID`].
    pub fn new(method: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self::with_id(DEFAULT_REQUEST_ID, method, params)
    }

    /// Create a request with an explicit id.
    pub fn with_id(id: impl Into<Id>, method: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[JsonValue] {
        &self.params
    }
}

/// Serializable [JSON-RPC request object](https://www.jsonrpc.org/specification#request-object).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestMessage {
    /// JSON-RPC version.
    pub jsonrpc: TwoPointZero,
    /// Request ID
    pub id: Id,
    /// Name of the method to be invoked.
    pub method: String,
    /// Positional parameter values of the request.
    pub params: Vec<JsonValue>,
}

impl RequestMessage {
    /// Create a serializable JSON-RPC method call.
    pub fn new(id: Id, method: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self {
            jsonrpc: TwoPointZero,
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize this request to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RpcError::unknown(format!("Error serializing request '{}' to JSON", self.method), e))
    }
}

impl From<&RpcRequest> for RequestMessage {
    fn from(request: &RpcRequest) -> Self {
        Self::new(request.id.clone(), request.method.clone(), request.params.clone())
    }
}

/// JSON-RPC response object as defined in the [spec](https://www.jsonrpc.org/specification#response_object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// JSON-RPC version.
    pub jsonrpc: TwoPointZero,
    /// Payload which can be result or error.
    #[serde(flatten)]
    pub payload: ResponsePayload,
    /// Request ID
    pub id: Id,
}

impl ResponseMessage {
    /// Create a owned successful response
    pub fn success(id: Id, result: JsonValue) -> Self {
        Self {
            jsonrpc: TwoPointZero,
            payload: ResponsePayload::Success(SuccessResponse { result }),
            id,
        }
    }

    /// Create an error response
    pub fn error(
        id: Id,
        code: ErrorCode,
        message: impl Into<String>,
        data: impl Into<Option<JsonValue>>,
    ) -> Self {
        Self {
            jsonrpc: TwoPointZero,
            payload: ResponsePayload::Error(ErrorResponse {
                error: ErrorDetails::new(code, message, data),
            }),
            id,
        }
    }

    /// Parse a response document from the raw bytes a transport received.
    ///
    /// Anything that isn't exactly one JSON-RPC response object, including an empty body or the
    /// literal `null`, fails with [`RpcError::Deserialization`] carrying the original text.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Option<ResponseMessage>>(bytes) {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(RpcError::deserialization(bytes, None)),
            Err(e) => Err(RpcError::deserialization(bytes, e)),
        }
    }

    /// Split this response into the result or a protocol error for `method`.
    pub fn into_result(self, method: &str) -> Result<JsonValue> {
        match self.payload {
            ResponsePayload::Success(success) => Ok(success.result),
            ResponsePayload::Error(error) => Err(RpcError::Protocol {
                method: method.to_string(),
                error: error.error,
            }),
        }
    }
}

/// Possible payloads of a JSON RPC response
///
/// This is an `untagged` enum so that serde will try to deserialize into each variant in order
/// until one succeeds.  This works because successs responses should have `result` and error
/// responses should have `error`.  A document with neither matches no variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Corresponds to failed JSON-RPC response with a error object with the field `error.
    Error(ErrorResponse),
    /// Corresponds to successful JSON-RPC response with the field `result`.
    Success(SuccessResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub result: JsonValue,
}

/// [Failed JSON-RPC response object](https://www.jsonrpc.org/specification#error_object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// [JSON-RPC failed response error details](https://www.jsonrpc.org/specification#error_object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Code
    pub code: ErrorCode,
    /// Message
    pub message: String,
    /// Optional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: impl Into<String>, data: impl Into<Option<JsonValue>>) -> Self {
        Self {
            code,
            message: message.into(),
            data: data.into(),
        }
    }
}
