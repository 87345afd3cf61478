//! Statement-scoped cancellation contexts.
//!
//! A [`StatementContext`] is the owning context a caller passes to
//! [`Connection::send`](crate::Connection::send). It pairs a cancellation
//! flag with its own mutex so that "check cancelled, then send" is one atomic
//! step: a cancellation requested between the check and the send cannot be
//! lost, and a cancellation observed after the send always wins over the
//! racing server response.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};

/// Cancellation state owned by one logical statement.
///
/// Shared between the task driving the statement and the task requesting
/// cancellation (wrap it in an `Arc`).
#[derive(Debug, Default)]
pub struct StatementContext {
    /// Guards the check-flag-then-send critical section.
    mutex: Mutex<()>,
    cancelled: AtomicBool,
    /// Request id of the in-flight execute/batch, recorded for out-of-band
    /// cancellation.
    in_flight: parking_lot::Mutex<Option<i64>>,
}

impl StatementContext {
    /// Create a fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the cancellation mutex.
    ///
    /// The dispatcher holds this guard across its cancelled-flag check and
    /// the request send.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().await
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Mark the statement cancelled.
    ///
    /// Taken under the same mutex the dispatcher holds while sending, so the
    /// request either observes the flag before touching the wire or has
    /// already recorded itself as in flight. Returns the in-flight request id
    /// the caller should target with a cancel request, if any.
    pub async fn cancel(&self) -> Option<i64> {
        let _guard = self.mutex.lock().await;
        self.cancelled.store(true, Ordering::SeqCst);
        *self.in_flight.lock()
    }

    /// Record the request currently on the wire for this statement.
    pub(crate) fn record_in_flight(&self, request_id: i64) {
        *self.in_flight.lock() = Some(request_id);
    }

    /// Request id currently on the wire, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<i64> {
        *self.in_flight.lock()
    }

    /// Clear cancellation state so the statement can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        *self.in_flight.lock() = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_sets_flag_and_reports_in_flight() {
        let ctx = StatementContext::new();
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.cancel().await, None);
        assert!(ctx.is_cancelled());

        ctx.reset();
        assert!(!ctx.is_cancelled());

        ctx.record_in_flight(42);
        assert_eq!(ctx.cancel().await, Some(42));
    }

    #[tokio::test]
    async fn test_cancel_waits_for_critical_section() {
        use std::sync::Arc;
        use std::time::Duration;

        let ctx = Arc::new(StatementContext::new());

        let guard = ctx.lock().await;
        let cancelling = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            async move { ctx.cancel().await }
        });

        // The cancel cannot complete while the dispatcher holds the mutex.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!ctx.is_cancelled());

        ctx.record_in_flight(7);
        drop(guard);

        assert_eq!(cancelling.await.unwrap(), Some(7));
        assert!(ctx.is_cancelled());
    }
}
