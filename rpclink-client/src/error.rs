use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors constructing a transport or a client from configuration.
///
/// Failures of individual calls are reported as [`rpclink_jsonrpc::RpcError`] instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("The configured '{header}' header value is not a valid HTTP header value")]
    InvalidHeader {
        header: &'static str,
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("Error building HTTP client for '{base_url}'")]
    BuildHttpClient {
        base_url: url::Url,
        source: reqwest::Error,
    },

    #[error("HTTP base URL '{base_url}' cannot be used as a base for request routes")]
    InvalidBaseUrl { base_url: url::Url },
}
