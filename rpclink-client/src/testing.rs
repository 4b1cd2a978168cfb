//! Helpers for testing the transports.
//!
//! This module is only compiled when `test` is enabled.  It's also included directly by the
//! integration tests, so it must not refer to anything in this crate.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use rpclink_jsonrpc::{Id, ResponseMessage, RpcError, RpcErrorKind, RpcLogger};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Initialize tracing with a subscriber and some reasonable defaults suitable for enabling log
/// output in tests.
///
/// This is idempotent; it can be called from multiple tests in multiple threads but will only
/// initialize tracing once.
pub fn init_test_logging() {
    use std::sync::OnceLock;

    const DEFAULT_LOG_FILTER: &str = "trace,hyper_util=info,mockito=info";
    static INIT_LOGGING: OnceLock<()> = OnceLock::new();

    INIT_LOGGING.get_or_init(|| {
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
            .with_test_writer()
            .try_init()
            .unwrap()
    });
}

/// [`RpcLogger`] that remembers what it was told.
#[derive(Default)]
pub struct RecordingLogger {
    requests: Mutex<Vec<String>>,
    responses: Mutex<Vec<Id>>,
    exceptions: Mutex<Vec<RpcErrorKind>>,
}

impl RecordingLogger {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<Id> {
        self.responses.lock().unwrap().clone()
    }

    pub fn exceptions(&self) -> Vec<RpcErrorKind> {
        self.exceptions.lock().unwrap().clone()
    }
}

impl RpcLogger for RecordingLogger {
    fn log_request(&self, raw_json: &str) {
        self.requests.lock().unwrap().push(raw_json.to_string());
    }

    fn log_response(&self, response: &ResponseMessage) {
        self.responses.lock().unwrap().push(response.id.clone());
    }

    fn log_exception(&self, error: &RpcError) {
        self.exceptions.lock().unwrap().push(error.kind());
    }
}

/// Reader that yields each of its chunks from a separate read, then EOF.
///
/// A chunk larger than the caller's buffer is split across reads.  Anything written to it is
/// discarded.
pub struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkedReader {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|chunk| chunk.as_ref().to_vec()).collect(),
        }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if let Some(mut chunk) = self.chunks.pop_front() {
            let len = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..len]);
            if len < chunk.len() {
                let rest = chunk.split_off(len);
                self.chunks.push_front(rest);
            }
        }

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ChunkedReader {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
