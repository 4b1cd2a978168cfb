//! The effective deadline that bounds every suspension point of a single call.
//!
//! A caller may pass its own [`CancellationToken`] with a call.  If it does, that token alone
//! decides when the call is abandoned, and abandonment is reported as [`RpcError::Cancelled`].
//! Otherwise a timer is started from the configured connection timeout, and expiry is reported as
//! [`RpcError::ClientTimeout`].
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project::pin_project;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::{Result, RpcError};

/// Default time allowed for a call when the caller doesn't supply a cancellation token.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone, Debug)]
pub enum Deadline {
    /// Cancellation is entirely under the control of the caller's token
    Token(CancellationToken),
    /// The call must complete by `at`, which is `timeout` after the call started
    Timer { at: Instant, timeout: Duration },
}

impl Deadline {
    /// Derive the effective deadline for a call starting now.
    pub fn effective(provided: Option<CancellationToken>, timeout: Duration) -> Self {
        match provided {
            Some(token) => Deadline::Token(token),
            None => Deadline::after(timeout),
        }
    }

    /// A timer-driven deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline::Timer {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    /// Whether the caller supplied the cancellation signal for this deadline.
    pub fn is_caller_provided(&self) -> bool {
        matches!(self, Deadline::Token(_))
    }

    /// The configured timeout, for timer-driven deadlines.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Deadline::Token(_) => None,
            Deadline::Timer { timeout, .. } => Some(*timeout),
        }
    }

    /// The error reported when this deadline expires.
    pub fn expired_error(&self) -> RpcError {
        match self {
            Deadline::Token(_) => RpcError::Cancelled,
            Deadline::Timer { timeout, .. } => RpcError::ClientTimeout { timeout: *timeout },
        }
    }

    /// Bound `future` by this deadline.
    ///
    /// The returned future resolves to the output of `future` if it completes first, or to the
    /// deadline's expiry error otherwise.  `future` is dropped either way.
    pub fn bound<F: Future>(&self, future: F) -> Bounded<F> {
        let expiry = match self {
            Deadline::Token(token) => Expiry::Token(token.clone().cancelled_owned()),
            Deadline::Timer { at, .. } => Expiry::Timer(tokio::time::sleep_until(*at)),
        };

        Bounded {
            future,
            expiry,
            deadline: self.clone(),
        }
    }
}

/// Future returned by [`Deadline::bound`].
#[pin_project]
pub struct Bounded<F> {
    #[pin]
    future: F,
    #[pin]
    expiry: Expiry,
    deadline: Deadline,
}

#[pin_project(project = ExpiryProj)]
enum Expiry {
    Token(#[pin] WaitForCancellationFutureOwned),
    Timer(#[pin] Sleep),
}

impl<F: Future> Future for Bounded<F> {
    type Output = Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // The wrapped future gets the first chance, so work that finishes right at the deadline
        // still counts
        if let Poll::Ready(output) = this.future.poll(cx) {
            return Poll::Ready(Ok(output));
        }

        let expired = match this.expiry.project() {
            ExpiryProj::Token(cancelled) => cancelled.poll(cx).is_ready(),
            ExpiryProj::Timer(sleep) => sleep.poll(cx).is_ready(),
        };

        if expired {
            Poll::Ready(Err(this.deadline.expired_error()))
        } else {
            Poll::Pending
        }
    }
}
