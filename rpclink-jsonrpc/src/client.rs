//! The request orchestrator: the transport-agnostic entry point callers make JSON-RPC calls
//! through.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::deadline::DEFAULT_CONNECTION_TIMEOUT;
use crate::interceptor::{Interceptor, Invocation, Next};
use crate::transport::Transport;
use crate::types::{Id, JsonValue, RpcRequest};
use crate::{Result, RpcError};

/// Optional per-call settings.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    /// Transport-specific route for this call, such as an HTTP path.
    pub route: Option<String>,

    /// Caller-controlled cancellation.  When set, this replaces the client's connection timeout
    /// for this call, and triggering it fails the call with [`RpcError::Cancelled`].
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    interceptor: Option<Arc<dyn Interceptor>>,
    connection_timeout: Duration,
}

impl ClientBuilder {
    /// Install the interceptor every call will be routed through.
    ///
    /// A client has at most one interceptor; calling this again replaces the previous one.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Time allowed for each exchange with the transport when the caller doesn't pass a
    /// cancellation token.  Defaults to [`DEFAULT_CONNECTION_TIMEOUT`].
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn build(self) -> Client {
        Client {
            transport: self.transport,
            interceptor: self.interceptor,
            connection_timeout: self.connection_timeout,
        }
    }
}

/// JSON-RPC client bound to a single [`Transport`].
///
/// Cheap to clone; clones share the transport and interceptor.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    interceptor: Option<Arc<dyn Interceptor>>,
    connection_timeout: Duration,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("remote_peer", &self.transport.remote_peer())
            .field("connection_timeout", &self.connection_timeout)
            .field("intercepted", &self.interceptor.is_some())
            .finish()
    }
}

impl Client {
    pub fn builder(transport: impl Transport) -> ClientBuilder {
        ClientBuilder {
            transport: Arc::new(transport),
            interceptor: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Identifier of the remote peer of the underlying transport
    pub fn remote_peer(&self) -> String {
        self.transport.remote_peer().into_owned()
    }

    /// Send a request and deserialize its result into `T`.
    pub async fn call<T>(&self, request: RpcRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.call_with(request, CallOptions::default()).await
    }

    /// Send a request with explicit [`CallOptions`] and deserialize its result into `T`.
    #[instrument(skip_all, fields(method = %request.method(), id = %request.id()))]
    pub async fn call_with<T>(&self, request: RpcRequest, options: CallOptions) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let method = request.method().to_string();
        let result = self.dispatch(request, options).await?;

        T::deserialize(&result).map_err(|e| RpcError::ResponseFormat {
            source: e,
            method,
            type_name: std::any::type_name::<T>(),
            result,
        })
    }

    /// Call `method` with positional `params`, deserializing the result into `T`.
    ///
    /// Each call gets a fresh unique id.  `params` is serialized to JSON: an array becomes the
    /// positional parameter list as-is, `()` or `None` becomes an empty list, and any other
    /// value is sent as the only parameter.
    pub async fn call_method<P, T>(&self, method: &str, params: P) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        self.call_method_with(method, params, CallOptions::default()).await
    }

    pub async fn call_method_with<P, T>(&self, method: &str, params: P, options: CallOptions) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = Self::method_request(method, params)?;
        self.call_with(request, options).await
    }

    /// Send a request and discard its result.
    ///
    /// The call still waits for the response, and still fails if the server answers with an
    /// error.
    pub async fn invoke(&self, request: RpcRequest) -> Result<()> {
        self.invoke_with(request, CallOptions::default()).await
    }

    #[instrument(skip_all, fields(method = %request.method(), id = %request.id()))]
    pub async fn invoke_with(&self, request: RpcRequest, options: CallOptions) -> Result<()> {
        self.dispatch(request, options).await.map(|_| ())
    }

    /// Call `method` with positional `params`, discarding the result.
    ///
    /// See [`Self::call_method`] for how `params` are encoded.
    pub async fn invoke_method<P>(&self, method: &str, params: P) -> Result<()>
    where
        P: Serialize,
    {
        self.invoke_method_with(method, params, CallOptions::default()).await
    }

    pub async fn invoke_method_with<P>(&self, method: &str, params: P, options: CallOptions) -> Result<()>
    where
        P: Serialize,
    {
        let request = Self::method_request(method, params)?;
        self.invoke_with(request, options).await
    }

    /// Run the send operation, through the interceptor if there is one.
    async fn dispatch(&self, request: RpcRequest, options: CallOptions) -> Result<JsonValue> {
        let invocation = Invocation {
            request,
            route: options.route,
            cancellation: options.cancellation,
        };
        let next = Next::new(&*self.transport, self.connection_timeout);

        match &self.interceptor {
            Some(interceptor) => interceptor.intercept(invocation, next).await,
            None => next.run(invocation).await,
        }
    }

    fn method_request<P: Serialize>(method: &str, params: P) -> Result<RpcRequest> {
        let params = match serde_json::to_value(params) {
            Ok(JsonValue::Array(values)) => values,
            Ok(JsonValue::Null) => Vec::new(),
            Ok(value) => vec![value],
            Err(e) => {
                return Err(RpcError::unknown(
                    format!("Error serializing parameters of '{method}' to JSON"),
                    e,
                ));
            }
        };

        Ok(RpcRequest::with_id(
            Id::Str(Uuid::now_v7().to_string()),
            method,
            params,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::testing::{self, ScriptedTransport};
    use crate::types::{DEFAULT_REQUEST_ID, ErrorCode, ResponseMessage};
    use crate::{Deadline, RpcErrorKind};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Block {
        number: u64,
        hash: String,
    }

    fn client_with(transport: &Arc<ScriptedTransport>) -> Client {
        Client::builder(transport.clone()).build()
    }

    #[tokio::test]
    async fn call_returns_coerced_result() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(Id::from("1"), json!("0x10")));
        let client = client_with(&transport);

        let request = RpcRequest::with_id("1", "getBlockNumber", vec![]);
        let value: String = client.call(request).await.unwrap();
        assert_eq!(value, "0x10");

        let sent = transport.sent_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.id, Id::from("1"));
        assert_eq!(sent[0].0.method, "getBlockNumber");
        assert!(sent[0].0.params.is_empty());
    }

    #[tokio::test]
    async fn call_deserializes_structured_results() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(
            DEFAULT_REQUEST_ID,
            json!({"number": 16, "hash": "0xabc"}),
        ));
        let client = client_with(&transport);

        let block: Block = client
            .call(RpcRequest::new("getBlock", vec![json!(16), json!(false)]))
            .await
            .unwrap();
        assert_eq!(
            block,
            Block {
                number: 16,
                hash: "0xabc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn protocol_error_is_not_coerced() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::error(
            Id::from("1"),
            ErrorCode::MethodNotFound,
            "Method not found",
            None,
        ));
        let client = client_with(&transport);

        // Even a target type that accepts anything must not see the error
        let result = client
            .call::<JsonValue>(RpcRequest::with_id("1", "getBlockNumbr", vec![]))
            .await;
        assert_matches!(result, Err(RpcError::Protocol { method, error }) => {
            assert_eq!(method, "getBlockNumbr");
            assert_eq!(error.code.code(), -32601);
            assert_eq!(error.message, "Method not found");
            assert_eq!(error.data, None);
        });
    }

    #[tokio::test]
    async fn shape_mismatch_is_a_format_error() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(DEFAULT_REQUEST_ID, json!("0x10")));
        let client = client_with(&transport);

        let result = client.call::<u64>(RpcRequest::new("getBlockNumber", vec![])).await;
        assert_matches!(result, Err(RpcError::ResponseFormat { method, type_name, result, .. }) => {
            assert_eq!(method, "getBlockNumber");
            assert_eq!(type_name, "u64");
            assert_eq!(result, json!("0x10"));
        });
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_error(RpcError::ClientTimeout {
            timeout: Duration::from_secs(20),
        });
        transport.push_error(RpcError::deserialization(b"garbage", None));
        let client = client_with(&transport);

        let first = client.call::<JsonValue>(RpcRequest::new("a", vec![])).await;
        assert_eq!(first.unwrap_err().kind(), RpcErrorKind::ClientTimeout);

        let second = client.invoke(RpcRequest::new("b", vec![])).await;
        assert_matches!(second, Err(RpcError::Deserialization { original_text, .. }) => {
            assert_eq!(original_text, "garbage");
        });
    }

    #[tokio::test]
    async fn invoke_discards_result_but_not_errors() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(DEFAULT_REQUEST_ID, json!({"ignored": true})));
        transport.push_response(ResponseMessage::error(
            DEFAULT_REQUEST_ID,
            ErrorCode::InternalError,
            "boom",
            json!({"trace": "xyz"}),
        ));
        let client = client_with(&transport);

        client.invoke(RpcRequest::new("setValue", vec![json!(1)])).await.unwrap();

        let result = client.invoke_method("setValue", [2]).await;
        assert_matches!(result, Err(RpcError::Protocol { error, .. }) => {
            assert_eq!(error.data, Some(json!({"trace": "xyz"})));
        });
    }

    #[tokio::test]
    async fn method_calls_get_unique_ids_and_positional_params() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..4 {
            transport.push_response(ResponseMessage::success(DEFAULT_REQUEST_ID, JsonValue::Null));
        }
        let client = client_with(&transport);

        client.invoke_method("tuple", ("0xabc", 5)).await.unwrap();
        client.invoke_method("unit", ()).await.unwrap();
        client.invoke_method("scalar", "latest").await.unwrap();
        client.invoke_method("object", json!({"to": "0x1"})).await.unwrap();

        let sent = transport.sent_requests();
        assert_eq!(sent[0].0.params, vec![json!("0xabc"), json!(5)]);
        assert!(sent[1].0.params.is_empty());
        assert_eq!(sent[2].0.params, vec![json!("latest")]);
        assert_eq!(sent[3].0.params, vec![json!({"to": "0x1"})]);

        assert_matches!(&sent[0].0.id, Id::Str(_));
        assert_ne!(sent[0].0.id, sent[1].0.id);
        assert_ne!(sent[1].0.id, sent[2].0.id);
    }

    #[tokio::test]
    async fn options_reach_the_transport() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(DEFAULT_REQUEST_ID, json!(1)));
        transport.push_response(ResponseMessage::success(DEFAULT_REQUEST_ID, json!(2)));
        let client = Client::builder(transport.clone())
            .with_connection_timeout(Duration::from_secs(3))
            .build();
        assert_eq!(client.connection_timeout(), Duration::from_secs(3));

        let token = CancellationToken::new();
        let options = CallOptions::default()
            .with_route("/v1/rpc")
            .with_cancellation(token);
        let _: u8 = client.call_method_with("a", (), options).await.unwrap();
        let _: u8 = client.call_method("b", ()).await.unwrap();

        let sent = transport.sent_requests();
        assert_eq!(sent[0].1.route.as_deref(), Some("/v1/rpc"));
        assert!(sent[0].1.deadline.is_caller_provided());

        assert_eq!(sent[1].1.route, None);
        assert_matches!(sent[1].1.deadline, Deadline::Timer { timeout, .. } => {
            assert_eq!(timeout, Duration::from_secs(3));
        });
    }

    #[tokio::test]
    async fn mismatched_response_id_is_accepted() {
        testing::init_test_logging();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ResponseMessage::success(Id::Number(99), json!(true)));
        let client = client_with(&transport);

        let value: bool = client.call(RpcRequest::new("ok", vec![])).await.unwrap();
        assert!(value);
    }
}
