use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Marker returned when a cancellable operation was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canceled;

/// Cooperative, run-wide cancellation signal.
///
/// Cloning shares the underlying token: triggering any clone cancels all of
/// them. Every suspension point of a run (transport calls, repeat delays)
/// races against it.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Wait for `duration`, or fail early once the signal fires.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Canceled> {
        if self.is_triggered() {
            return Err(Canceled);
        }
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return if self.is_triggered() { Err(Canceled) } else { Ok(()) };
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Canceled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the signal fires first; the future is
    /// dropped on cancellation.
    pub async fn race<F: Future>(&self, fut: F) -> Result<F::Output, Canceled> {
        if self.is_triggered() {
            return Err(Canceled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Canceled),
            out = fut => Ok(out),
        }
    }
}
