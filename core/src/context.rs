//! Cancellation and deadline scope for a single logical call.
//!
//! # Design
//! A `Context` pairs a [`CancellationToken`] with an optional deadline. The
//! execution core races the transport against [`Context::done`], so cancelling
//! the context aborts the pending network operation. Contexts form a tree:
//! [`Context::child`] is cancelled with its parent but never the other way round.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelReason {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a context cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some` once the context is done. Cancellation is reported before an
    /// expired deadline.
    pub fn err(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelReason::Canceled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Canceled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_live() {
        assert_eq!(Context::new().err(), None);
    }

    #[test]
    fn cancel_propagates_to_children_only() {
        let parent = Context::new();
        let child = parent.child();
        let sibling = parent.child();

        child.cancel();
        assert_eq!(child.err(), Some(CancelReason::Canceled));
        assert_eq!(parent.err(), None);
        assert_eq!(sibling.err(), None);

        parent.cancel();
        assert_eq!(sibling.err(), Some(CancelReason::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expires() {
        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.done().await, CancelReason::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let ctx = Context::new()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(60));
        let start = Instant::now();
        ctx.done().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn done_resolves_on_cancel() {
        let ctx = Context::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.done().await });
        ctx.cancel();
        assert_eq!(handle.await.unwrap(), CancelReason::Canceled);
    }
}
