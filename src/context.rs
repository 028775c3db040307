//! Cancellation Context
//!
//! A `Context` carries an optional cancellation token and an optional
//! deadline for one dial. [`Context::run`] awaits a handshake alongside both,
//! dropping the pending I/O as soon as either fires.

use std::future::{pending, Future};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SocksError;

/// Cancellation signal and deadline for a dial
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled through `token`
    pub fn with_cancel(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline(deadline)
    }

    /// Derive a context with its own token, cancelled whenever this
    /// context's token is. Cancelling the child leaves the parent alone.
    pub fn child(&self) -> Self {
        let token = match &self.token {
            Some(token) => token.child_token(),
            None => CancellationToken::new(),
        };
        Self {
            token: Some(token),
            deadline: self.deadline,
        }
    }

    /// Attach a cancellation token, replacing any previous one
    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Bound this context by `deadline`. An earlier existing deadline wins.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Bound this context by `timeout` from now.
    ///
    /// A timeout too large to represent as an instant adds no deadline.
    pub fn timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.deadline(deadline),
            None => self,
        }
    }

    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    pub fn get_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Neither cancellable nor bounded
    pub fn is_background(&self) -> bool {
        self.token.is_none() && self.deadline.is_none()
    }

    /// The error this context reports once done, if it is done
    pub fn err(&self) -> Option<SocksError> {
        if self.token.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Some(SocksError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(SocksError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Run `operation` until it completes, the token is cancelled, or the
    /// deadline passes.
    ///
    /// Cancellation is polled first, so when it races with an I/O failure or
    /// even a success, the caller sees [`SocksError::Cancelled`]. Nothing is
    /// spawned: once this returns, no part of the operation is still running.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, SocksError>
    where
        F: Future<Output = Result<T, SocksError>>,
    {
        if self.is_background() {
            return operation.await;
        }

        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending().await,
            }
        };

        tokio::select! {
            biased;

            _ = cancelled => {
                debug!("Operation cancelled");
                Err(SocksError::Cancelled)
            }
            _ = expired => {
                debug!("Operation deadline exceeded");
                Err(SocksError::DeadlineExceeded)
            }
            result = operation => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        assert!(ctx.is_background());

        let value = ctx.run(async { Ok::<_, SocksError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_operation() {
        let token = CancellationToken::new();
        let ctx = Context::with_cancel(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = ctx.run(pending::<Result<(), SocksError>>()).await;
        assert!(matches!(result, Err(SocksError::Cancelled)));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_io_error() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::with_cancel(token);

        let result = ctx
            .run(async {
                Err::<(), _>(SocksError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "i/o timeout",
                )))
            })
            .await;

        assert!(matches!(result, Err(SocksError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_secs(5));

        let result = ctx.run(pending::<Result<(), SocksError>>()).await;
        assert!(matches!(result, Err(SocksError::DeadlineExceeded)));
        assert!(matches!(ctx.err(), Some(SocksError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let soon = Instant::now() + Duration::from_secs(1);
        let later = Instant::now() + Duration::from_secs(60);

        let ctx = Context::background().deadline(soon).deadline(later);
        assert_eq!(ctx.get_deadline(), Some(soon));
        assert!(ctx.err().is_none());
    }

    #[tokio::test]
    async fn test_with_deadline() {
        let deadline = Instant::now() + Duration::from_secs(30);
        let ctx = Context::with_deadline(deadline).timeout(Duration::from_secs(60));

        assert_eq!(ctx.get_deadline(), Some(deadline));
        assert!(ctx.cancellation_token().is_none());
        assert!(!ctx.is_background());
    }

    #[tokio::test]
    async fn test_huge_timeout_has_no_deadline() {
        let ctx = Context::with_timeout(Duration::MAX);
        assert!(ctx.get_deadline().is_none());

        let value = ctx.run(async { Ok::<_, SocksError>(1) }).await.unwrap();
        assert_eq!(value, 1);

        let soon = Instant::now() + Duration::from_secs(1);
        let ctx = Context::with_deadline(soon).timeout(Duration::MAX);
        assert_eq!(ctx.get_deadline(), Some(soon));
    }

    #[tokio::test]
    async fn test_child_cancelled_with_parent() {
        let parent_token = CancellationToken::new();
        let parent = Context::with_cancel(parent_token.clone()).timeout(Duration::from_secs(60));
        let child = parent.child();

        assert_eq!(child.get_deadline(), parent.get_deadline());
        assert!(child.err().is_none());

        parent_token.cancel();
        assert!(matches!(child.err(), Some(SocksError::Cancelled)));

        let result = child.run(pending::<Result<(), SocksError>>()).await;
        assert!(matches!(result, Err(SocksError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent() {
        let parent = Context::with_cancel(CancellationToken::new());
        let child = parent.child();

        if let Some(token) = child.cancellation_token() {
            token.cancel();
        }

        assert!(matches!(child.err(), Some(SocksError::Cancelled)));
        assert!(parent.err().is_none());

        // A background parent still yields a cancellable child
        let child = Context::background().child();
        assert!(child.cancellation_token().is_some());
        assert!(!child.is_background());
    }
}
