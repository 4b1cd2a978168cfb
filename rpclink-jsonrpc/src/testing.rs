//! Helpers for testing the JSON RPC client.
//!
//! This module is only compiled when `test` is enabled
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::transport::{SendContext, Transport};
use crate::types::{RequestMessage, ResponseMessage};
use crate::{Result, RpcError};

/// Initialize tracing with a subscriber and some reasonable defaults suitable for enabling log
/// output in tests.
///
/// This is idempotent; it can be called from multiple tests in multiple threads but will only
/// initialize tracing once.
pub fn init_test_logging() {
    use std::sync::OnceLock;

    const DEFAULT_LOG_FILTER: &str = "trace";
    static INIT_LOGGING: OnceLock<()> = OnceLock::new();

    INIT_LOGGING.get_or_init(|| {
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
            .with_test_writer()
            .try_init()
            .unwrap()
    });
}

/// Transport that answers each send with the next scripted outcome, and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<ResponseMessage>>>,
    sent: Mutex<Vec<(RequestMessage, SendContext)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: ResponseMessage) {
        self.outcomes.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: RpcError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    /// Every request sent so far, with the context it was sent with, in order
    pub fn sent_requests(&self) -> Vec<(RequestMessage, SendContext)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn remote_peer(&self) -> Cow<'static, str> {
        "scripted".into()
    }

    async fn send(&self, request: &RequestMessage, context: &SendContext) -> Result<ResponseMessage> {
        self.sent.lock().unwrap().push((request.clone(), context.clone()));

        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(RpcError::unknown("No scripted response left", "script exhausted")))
    }
}
