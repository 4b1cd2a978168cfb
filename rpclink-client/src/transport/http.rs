//! JSON-RPC over HTTP POST.
//!
//! Each call is an independent HTTP request, so this transport imposes no ordering between
//! concurrent calls.  The only shared state is the pair of HTTP client handles: the active one is
//! replaced every [`HANDLE_REFRESH_INTERVAL`] so that long-lived processes pick up DNS changes and
//! don't hold on to stale pooled connections forever.  Handles are reference counted, so the one
//! being replaced stays alive for as long as some in-flight call is still using it.
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use rpclink_jsonrpc::{
    Deadline, RequestMessage, ResponseMessage, RpcError, RpcLogger, SendContext,
    TracingLogger, Transport,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use crate::{ClientError, Result};

/// How long an HTTP client handle is used before it's replaced with a fresh one.
pub const HANDLE_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Produces the [`reqwest::ClientBuilder`] each new handle is built from.
///
/// Use this to customize TLS, proxies, pool settings and the like.  The transport adds its own
/// default headers on top of whatever the builder is configured with.
pub type ClientFactory = Arc<dyn Fn() -> reqwest::ClientBuilder + Send + Sync>;

/// Value of the `Authorization` header sent with every request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthHeader {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: Option<String>,
    },
}

impl AuthHeader {
    fn header_value(&self) -> Result<HeaderValue> {
        let value = match self {
            AuthHeader::Bearer { token } => format!("Bearer {token}"),
            AuthHeader::Basic { username, password } => {
                let credentials = format!("{username}:{}", password.as_deref().unwrap_or_default());
                format!("Basic {}", BASE64_STANDARD.encode(credentials))
            }
        };

        let mut value = HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader {
            header: "Authorization",
            source: e,
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

// Credentials must never end up in logs
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHeader::Bearer { .. } => f.debug_struct("Bearer").field("token", &"<redacted>").finish(),
            AuthHeader::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

pub struct HttpTransportBuilder {
    base_url: Url,
    auth: Option<AuthHeader>,
    refresh_interval: Duration,
    client_factory: Option<ClientFactory>,
    logger: Arc<dyn RpcLogger>,
}

impl HttpTransportBuilder {
    pub fn with_auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Override [`HANDLE_REFRESH_INTERVAL`]
    pub fn with_handle_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_client_factory(
        mut self,
        factory: impl Fn() -> reqwest::ClientBuilder + Send + Sync + 'static,
    ) -> Self {
        self.client_factory = Some(Arc::new(factory));
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RpcLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Build the transport along with its first client handle.
    pub fn build(self) -> Result<HttpTransport> {
        if self.base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                base_url: self.base_url,
            });
        }

        let mut default_headers = HeaderMap::new();
        if let Some(auth) = &self.auth {
            default_headers.insert(AUTHORIZATION, auth.header_value()?);
        }

        let factory = HandleFactory {
            base_url: self.base_url.clone(),
            default_headers,
            client_factory: self.client_factory,
        };
        let first = Arc::new(factory.build(0)?);

        Ok(HttpTransport {
            base_url: self.base_url,
            factory,
            refresh_interval: self.refresh_interval,
            active: Mutex::new(first),
            logger: self.logger,
        })
    }
}

/// One HTTP client along with when it was built.
///
/// The `reqwest::Client` owns the connection pool, so replacing the handle also replaces every
/// pooled connection.
struct HttpHandle {
    client: reqwest::Client,
    created_at: Instant,
    generation: u64,
}

struct HandleFactory {
    base_url: Url,
    default_headers: HeaderMap,
    client_factory: Option<ClientFactory>,
}

impl HandleFactory {
    fn build(&self, generation: u64) -> Result<HttpHandle> {
        let builder = match &self.client_factory {
            Some(factory) => factory(),
            None => reqwest::Client::builder(),
        };

        let client = builder
            .default_headers(self.default_headers.clone())
            .build()
            .map_err(|e| ClientError::BuildHttpClient {
                base_url: self.base_url.clone(),
                source: e,
            })?;

        Ok(HttpHandle {
            client,
            created_at: Instant::now(),
            generation,
        })
    }
}

/// [`Transport`] that POSTs each request to an HTTP endpoint.
pub struct HttpTransport {
    base_url: Url,
    factory: HandleFactory,
    refresh_interval: Duration,
    /// The handle new calls pick up.  Calls already in flight hold their own reference.
    active: Mutex<Arc<HttpHandle>>,
    logger: Arc<dyn RpcLogger>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generation = self.active.lock().unwrap_or_else(PoisonError::into_inner).generation;
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("generation", &generation)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn builder(base_url: Url) -> HttpTransportBuilder {
        HttpTransportBuilder {
            base_url,
            auth: None,
            refresh_interval: HANDLE_REFRESH_INTERVAL,
            client_factory: None,
            logger: Arc::new(TracingLogger),
        }
    }

    /// Transport for `base_url` with default settings
    pub fn new(base_url: Url) -> Result<Self> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The handle new requests should use, rotating it first if it's too old.
    ///
    /// The lock is held only for the age check and the rotation, never across I/O.
    fn active_handle(&self) -> Arc<HttpHandle> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.created_at.elapsed() < self.refresh_interval {
            return active.clone();
        }

        let generation = active.generation + 1;
        match self.factory.build(generation) {
            Ok(handle) => {
                *active = Arc::new(handle);
                tracing::debug!(generation, base_url = %self.base_url, "Rotated HTTP client handle");
                active.clone()
            }
            Err(e) => {
                tracing::warn!(
                    err = %e,
                    generation = active.generation,
                    "Failed to build replacement HTTP client; continuing with the current one"
                );
                active.clone()
            }
        }
    }

    fn request_url(&self, route: Option<&str>) -> rpclink_jsonrpc::Result<Url> {
        match route {
            None | Some("") => Ok(self.base_url.clone()),
            Some(route) => self.base_url.join(route).map_err(|e| {
                RpcError::unknown(format!("Invalid route '{route}' relative to '{}'", self.base_url), e)
            }),
        }
    }

    async fn post(&self, request: &RequestMessage, context: &SendContext) -> rpclink_jsonrpc::Result<ResponseMessage> {
        let body = request.to_json()?;
        self.logger.log_request(&body);

        let url = self.request_url(context.route.as_deref())?;
        let handle = self.active_handle();
        tracing::trace!(%url, generation = handle.generation, "Posting JSON-RPC request");

        let response = context
            .deadline
            .bound(
                handle
                    .client
                    .post(url.clone())
                    .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                    .body(body)
                    .send(),
            )
            .await?
            .map_err(|e| classify_http_error(e, &context.deadline))?;

        if let Err(e) = response.error_for_status_ref() {
            return Err(RpcError::unknown(
                format!("HTTP request to '{url}' failed with status {}", response.status()),
                e,
            ));
        }

        let bytes = context
            .deadline
            .bound(response.bytes())
            .await?
            .map_err(|e| classify_http_error(e, &context.deadline))?;

        ResponseMessage::from_slice(&bytes)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn remote_peer(&self) -> Cow<'static, str> {
        self.base_url.to_string().into()
    }

    async fn send(&self, request: &RequestMessage, context: &SendContext) -> rpclink_jsonrpc::Result<ResponseMessage> {
        let result = self.post(request, context).await;

        match &result {
            Ok(response) => self.logger.log_response(response),
            Err(e) => self.logger.log_exception(e),
        }

        result
    }
}

fn classify_http_error(error: reqwest::Error, deadline: &Deadline) -> RpcError {
    match deadline.timeout() {
        // A timeout configured on a custom client factory is still a timeout
        Some(timeout) if error.is_timeout() => RpcError::ClientTimeout { timeout },
        // Nothing was configured to time out, so there's no timeout to report
        None if error.is_timeout() => RpcError::unknown("HTTP client timed out sending RPC request", error),
        _ => RpcError::unknown("Error occurred when trying to send RPC request", error),
    }
}
