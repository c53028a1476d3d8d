//! Observable futures over a single send ([`Handle`]) and a batch of sends
//! ([`BatchHandle`]).

use notifyhub_domain::{BatchSummary, HandleState, MessageId, Receipt};
use notifyhub_shared::{CancellationToken, ErrorCode, ErrorEnvelope, Result as SharedResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;
use tokio::sync::{mpsc, watch};

/// The value a [`Handle`] ultimately resolves to: the authoritative
/// [`Receipt`] on success/partial delivery, or an error on total failure,
/// cancellation, or timeout.
pub type AsyncResult = SharedResult<Receipt>;

/// Error returned by [`Handle::cancel`] when the handle already reached a
/// non-cancelled terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyTerminal;

impl std::fmt::Display for AlreadyTerminal {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("handle already reached a terminal state")
    }
}

impl std::error::Error for AlreadyTerminal {}

/// Point-in-time view of a [`Handle`].
#[derive(Debug, Clone)]
pub struct HandleSnapshot {
    /// Current lifecycle state.
    pub state: HandleState,
    /// Delivery progress in `[0, 1]`.
    pub progress: f64,
    /// Error recorded on the most recent non-success transition.
    pub last_error: Option<ErrorEnvelope>,
    /// Final receipt, populated once `state` is [`HandleState::Completed`].
    pub receipt: Option<Receipt>,
    /// When this snapshot was produced.
    pub updated_at: SystemTime,
}

impl HandleSnapshot {
    fn pending() -> Self {
        Self {
            state: HandleState::Pending,
            progress: 0.0,
            last_error: None,
            receipt: None,
            updated_at: SystemTime::now(),
        }
    }
}

/// Observable future over the delivery of a single [`notifyhub_domain::Message`].
///
/// Created by the async executor at enqueue time; the caller owns an
/// [`Arc<Handle>`] that outlives the enqueue call. State transitions are
/// monotone: once terminal, a handle never reverts (see
/// [`HandleState::is_terminal`]).
pub struct Handle {
    message_id: MessageId,
    created_at: SystemTime,
    cancel: CancellationToken,
    snapshot: watch::Sender<HandleSnapshot>,
    result_tx: std::sync::Mutex<Option<tokio::sync::oneshot::Sender<AsyncResult>>>,
    result_rx: tokio::sync::Mutex<Option<tokio::sync::oneshot::Receiver<AsyncResult>>>,
}

impl Handle {
    /// Create a new handle in the [`HandleState::Pending`] state.
    #[must_use]
    pub fn new(message_id: MessageId) -> Self {
        let (snapshot, _) = watch::channel(HandleSnapshot::pending());
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        Self {
            message_id,
            created_at: SystemTime::now(),
            cancel: CancellationToken::new(),
            snapshot,
            result_tx: std::sync::Mutex::new(Some(result_tx)),
            result_rx: tokio::sync::Mutex::new(Some(result_rx)),
        }
    }

    /// The message this handle tracks.
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// When the handle was created.
    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Current snapshot.
    #[must_use]
    pub fn status(&self) -> HandleSnapshot {
        self.snapshot.borrow().clone()
    }

    /// True once [`HandleSnapshot::state`] is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.snapshot.borrow().state.is_terminal()
    }

    /// True once [`Handle::cancel`] has been requested, regardless of whether
    /// the terminal `Cancelled` state has been recorded yet (a worker may
    /// still be mid-dispatch).
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request cancellation.
    ///
    /// If the item has not yet been picked up by a worker (`Pending`), the
    /// terminal `Cancelled` state is recorded immediately. If a worker is
    /// already dispatching it, the in-flight adapter call is left to run to
    /// completion; [`Handle::complete`]/[`Handle::fail`] will observe the
    /// cancellation request and record `Cancelled` instead, discarding the
    /// receipt. Calling this again after cancellation already landed is a
    /// no-op; calling it after a *different* terminal state was reached
    /// fails.
    ///
    /// # Errors
    /// Returns [`AlreadyTerminal`] if the handle already completed or failed.
    pub fn cancel(&self) -> Result<(), AlreadyTerminal> {
        let current = self.snapshot.borrow().state;
        if current.is_terminal() && current != HandleState::Cancelled {
            return Err(AlreadyTerminal);
        }
        self.cancel.cancel();
        if current == HandleState::Pending {
            self.transition(HandleState::Cancelled, 0.0, None, None);
        }
        Ok(())
    }

    /// Transition to `Processing` with a small initial progress bump, unless
    /// cancellation was requested while the item sat in the queue.
    pub fn mark_processing(&self) {
        if self.is_cancel_requested() {
            return;
        }
        self.transition(HandleState::Processing, 0.1, None, None);
    }

    /// Report incremental progress while `Processing`. No-op once terminal.
    pub fn set_progress(&self, progress: f64) {
        if self.is_terminal() {
            return;
        }
        self.transition(HandleState::Processing, progress.clamp(0.0, 1.0), None, None);
    }

    /// Record a successful (or partial) delivery outcome.
    ///
    /// If cancellation was requested mid-flight, the receipt is discarded and
    /// `Cancelled` is recorded instead, per the cooperative-cancellation
    /// contract.
    pub fn complete(&self, receipt: Receipt) {
        if self.is_terminal() {
            return;
        }
        if self.is_cancel_requested() {
            self.transition(HandleState::Cancelled, 0.0, None, None);
            return;
        }
        self.transition(HandleState::Completed, 1.0, Some(receipt), None);
    }

    /// Record a failed delivery outcome.
    pub fn fail(&self, error: ErrorEnvelope) {
        if self.is_terminal() {
            return;
        }
        if self.is_cancel_requested() {
            self.transition(HandleState::Cancelled, 0.0, None, None);
            return;
        }
        self.transition(HandleState::Failed, self.status().progress, None, Some(error));
    }

    fn transition(
        &self,
        state: HandleState,
        progress: f64,
        receipt: Option<Receipt>,
        last_error: Option<ErrorEnvelope>,
    ) {
        let mut became_terminal = false;
        self.snapshot.send_modify(|snapshot| {
            if snapshot.state.is_terminal() {
                return;
            }
            snapshot.state = state;
            snapshot.progress = progress;
            snapshot.updated_at = SystemTime::now();
            if receipt.is_some() {
                snapshot.receipt = receipt;
            }
            if last_error.is_some() {
                snapshot.last_error = last_error;
            }
            became_terminal = state.is_terminal();
        });
        if became_terminal {
            if let Some(result) = terminal_result(&self.snapshot.borrow(), &self.message_id) {
                if let Some(sender) = self
                    .result_tx
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .take()
                {
                    let _ignored_if_no_receiver = sender.send(result);
                }
            }
        }
    }

    /// Take ownership of the one-shot result receiver: it yields the
    /// terminal [`AsyncResult`] exactly once, buffered at capacity 1 so a
    /// caller that takes it after the handle already went terminal still
    /// observes the value (a `oneshot::Receiver` holds its value until
    /// polled). Only the first caller gets a receiver; subsequent calls
    /// return `None`, matching [`BatchHandle::take_progress`]'s shape.
    pub async fn result(&self) -> Option<tokio::sync::oneshot::Receiver<AsyncResult>> {
        self.result_rx.lock().await.take()
    }

    /// Block until the handle reaches a terminal state, the caller's own
    /// `external_cancel` fires, or the handle's own cancel signal fires.
    ///
    /// Multiple concurrent callers all observe the same terminal value
    /// (broadcast semantics of [`watch::Sender`]).
    ///
    /// # Errors
    /// Returns the terminal error when the handle failed, or a cancellation
    /// error when either cancellation source fired before a terminal state
    /// was reached.
    pub async fn wait(&self, external_cancel: Option<&CancellationToken>) -> AsyncResult {
        let mut receiver = self.snapshot.subscribe();
        loop {
            if let Some(result) = terminal_result(&receiver.borrow(), &self.message_id) {
                return result;
            }
            let changed = receiver.changed();
            match external_cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            return Err(ErrorEnvelope::cancelled("wait cancelled by caller context"));
                        }
                        res = changed => {
                            if res.is_err() {
                                return Err(ErrorEnvelope::cancelled("handle dropped before completion"));
                            }
                        }
                    }
                },
                None => {
                    if changed.await.is_err() {
                        return Err(ErrorEnvelope::cancelled("handle dropped before completion"));
                    }
                },
            }
        }
    }

    /// A receive-only view of this handle's snapshots, buffered at capacity 1
    /// (the `watch` channel always holds exactly the latest value). Useful
    /// for callers that want to poll `changed()` themselves rather than
    /// calling [`Handle::wait`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HandleSnapshot> {
        self.snapshot.subscribe()
    }
}

fn terminal_result(snapshot: &HandleSnapshot, message_id: &MessageId) -> Option<AsyncResult> {
    match snapshot.state {
        HandleState::Completed => snapshot.receipt.clone().map(Ok),
        HandleState::Failed => Some(Err(snapshot.last_error.clone().unwrap_or_else(|| {
            ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                format!("message {message_id} failed without a recorded error"),
                notifyhub_shared::ErrorClass::NonRetriable,
            )
        }))),
        HandleState::Cancelled => Some(Err(ErrorEnvelope::cancelled(format!(
            "message {message_id} was cancelled"
        )))),
        HandleState::Pending | HandleState::Processing => None,
    }
}

/// A best-effort progress notification emitted while a [`BatchHandle`] is
/// still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Children that have reached a terminal state so far.
    pub completed: usize,
    /// Total children in the batch.
    pub total: usize,
}

/// Observable future over a batch of [`Handle`]s submitted together.
pub struct BatchHandle {
    batch_id: notifyhub_domain::BatchId,
    children: Vec<Arc<Handle>>,
    completed: AtomicUsize,
    failed: AtomicUsize,
    cancel: CancellationToken,
    progress_tx: mpsc::Sender<BatchProgress>,
    progress_rx: tokio::sync::Mutex<Option<mpsc::Receiver<BatchProgress>>>,
    summary: watch::Sender<Option<BatchSummary>>,
}

impl BatchHandle {
    /// Create a batch handle wrapping `children`, all submitted together.
    #[must_use]
    pub fn new(batch_id: notifyhub_domain::BatchId, children: Vec<Arc<Handle>>) -> Self {
        let (progress_tx, progress_rx) = mpsc::channel(32);
        let (summary, _) = watch::channel(None);
        Self {
            batch_id,
            children,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
            progress_tx,
            progress_rx: tokio::sync::Mutex::new(Some(progress_rx)),
            summary,
        }
    }

    /// The batch's id.
    #[must_use]
    pub const fn batch_id(&self) -> &notifyhub_domain::BatchId {
        &self.batch_id
    }

    /// The child handles, in submission order.
    #[must_use]
    pub fn children(&self) -> &[Arc<Handle>] {
        &self.children
    }

    /// Total number of children.
    #[must_use]
    pub fn total(&self) -> usize {
        self.children.len()
    }

    /// Shared cancellation signal used to cancel every child.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every child; best-effort per [`Handle::cancel`]'s own rules.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
        for child in &self.children {
            let _ignored_if_already_terminal = child.cancel();
        }
    }

    /// Record that one child reached a terminal state; updates counters,
    /// publishes a best-effort progress event, and resolves the batch
    /// summary once every child is accounted for.
    pub fn record_child_terminal(&self, succeeded: bool) {
        if succeeded {
            self.completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let total = self.total();

        let _dropped_if_full = self.progress_tx.try_send(BatchProgress { completed, total });

        if completed + failed >= total {
            let _ignored_no_subscribers = self.summary.send(Some(BatchSummary {
                total,
                completed,
                failed,
            }));
        }
    }

    /// True once every child has reached a terminal state.
    #[must_use]
    pub fn is_done(&self) -> bool {
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        completed + failed >= self.total()
    }

    /// Current counters, independent of completion.
    #[must_use]
    pub fn counters(&self) -> (usize, usize, usize) {
        (
            self.completed.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
            self.total(),
        )
    }

    /// Take ownership of the progress event receiver. Only the first caller
    /// gets a channel; subsequent calls return `None`.
    pub async fn take_progress(&self) -> Option<mpsc::Receiver<BatchProgress>> {
        self.progress_rx.lock().await.take()
    }

    /// Block until every child reaches a terminal state, or `external_cancel`
    /// fires first.
    pub async fn wait(&self, external_cancel: Option<&CancellationToken>) -> BatchSummary {
        let mut receiver = self.summary.subscribe();
        loop {
            if let Some(summary) = *receiver.borrow() {
                return summary;
            }
            let changed = receiver.changed();
            match external_cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            let (completed, failed, total) = self.counters();
                            return BatchSummary { total, completed, failed };
                        }
                        res = changed => {
                            if res.is_err() {
                                let (completed, failed, total) = self.counters();
                                return BatchSummary { total, completed, failed };
                            }
                        }
                    }
                },
                None => {
                    if changed.await.is_err() {
                        let (completed, failed, total) = self.counters();
                        return BatchSummary { total, completed, failed };
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_domain::{ReceiptStatus, SendResult, Target};
    use std::time::Duration;

    fn receipt() -> Receipt {
        let target = Target::builder("email", "a@example.com", "smtp")
            .build()
            .expect("valid target");
        Receipt {
            message_id: MessageId::generate(),
            status: ReceiptStatus::Success,
            total: 1,
            successful: 1,
            failed: 0,
            results: vec![SendResult::success(
                target,
                "smtp",
                SystemTime::now(),
                Duration::from_millis(1),
                1,
            )],
            completed_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn pending_to_completed_resolves_wait() {
        let handle = Handle::new(MessageId::generate());
        handle.mark_processing();
        handle.complete(receipt());
        let result = handle.wait(None).await;
        assert!(result.is_ok());
        assert_eq!(handle.status().state, HandleState::Completed);
    }

    #[tokio::test]
    async fn cancel_before_pickup_is_immediate() {
        let handle = Handle::new(MessageId::generate());
        handle.cancel().expect("cancel pending handle");
        assert_eq!(handle.status().state, HandleState::Cancelled);
        let result = handle.wait(None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancel_during_processing_discards_receipt() {
        let handle = Handle::new(MessageId::generate());
        handle.mark_processing();
        handle.cancel().expect("cancel in-flight handle");
        assert_eq!(handle.status().state, HandleState::Processing);
        handle.complete(receipt());
        assert_eq!(handle.status().state, HandleState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_after_terminal_fails() {
        let handle = Handle::new(MessageId::generate());
        handle.mark_processing();
        handle.complete(receipt());
        let result = handle.cancel();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn concurrent_waiters_observe_same_terminal_value() {
        let handle = Arc::new(Handle::new(MessageId::generate()));
        let h1 = Arc::clone(&handle);
        let h2 = Arc::clone(&handle);
        let w1 = tokio::spawn(async move { h1.wait(None).await });
        let w2 = tokio::spawn(async move { h2.wait(None).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.mark_processing();
        handle.complete(receipt());
        let (r1, r2) = tokio::join!(w1, w2);
        assert!(r1.expect("join").is_ok());
        assert!(r2.expect("join").is_ok());
    }

    #[tokio::test]
    async fn result_channel_delivers_exactly_once_even_if_taken_after_terminal() {
        let handle = Handle::new(MessageId::generate());
        handle.mark_processing();
        handle.complete(receipt());
        let rx = handle.result().await.expect("first caller gets a receiver");
        assert!(handle.result().await.is_none());
        let result = rx.await.expect("sender not dropped");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn batch_handle_resolves_once_all_children_terminal() {
        let batch_id = notifyhub_domain::BatchId::generate();
        let children = vec![
            Arc::new(Handle::new(MessageId::generate())),
            Arc::new(Handle::new(MessageId::generate())),
        ];
        let batch = Arc::new(BatchHandle::new(batch_id, children));
        assert!(!batch.is_done());
        batch.record_child_terminal(true);
        assert!(!batch.is_done());
        batch.record_child_terminal(false);
        assert!(batch.is_done());
        let summary = batch.wait(None).await;
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 2);
    }
}
