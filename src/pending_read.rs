use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tokio::sync::oneshot;

use crate::{page_ref::SerializedChunk, result::BufferResult};

/// A single outstanding `getPages` request whose future has not yet been resolved.
///
/// At most one `PendingRead` may be installed on a buffer at a time. It holds the sending half of
/// a one-shot channel; [`GetPagesFuture`] holds the receiving half and is what `getPages` hands
/// back to its caller.
pub(crate) struct PendingRead<P> {
    task_instance_id: Arc<str>,
    sequence_id: u64,
    max_bytes: u64,
    sender: Option<oneshot::Sender<BufferResult<P>>>,
}

impl<P> PendingRead<P>
where
    P: SerializedChunk,
{
    /// Constructs a new pending read, along with the future its result should be delivered
    /// through.
    pub(crate) fn new(
        task_instance_id: Arc<str>,
        sequence_id: u64,
        max_bytes: u64,
    ) -> (Self, GetPagesFuture<P>) {
        let (sender, receiver) = oneshot::channel();

        let pending = Self {
            task_instance_id: Arc::clone(&task_instance_id),
            sequence_id,
            max_bytes,
            sender: Some(sender),
        };

        let future = GetPagesFuture {
            task_instance_id,
            sequence_id,
            receiver,
        };

        (pending, future)
    }

    pub(crate) fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub(crate) fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Resolves this read with an empty result carrying its own `sequence_id` and
    /// `finished=false`. Idempotent: a second call is a no-op because the sender was already
    /// consumed.
    pub(crate) fn complete_with_empty(mut self) {
        if let Some(sender) = self.sender.take() {
            let result = BufferResult::empty(self.task_instance_id, self.sequence_id, false);
            // The receiver may have been dropped (e.g. the caller gave up on the future); that's
            // not our problem to report.
            let _ = sender.send(result);
        }
    }

    /// Resolves this read with a computed result. Idempotent for the same reason as
    /// [`PendingRead::complete_with_empty`].
    pub(crate) fn complete_with(mut self, result: BufferResult<P>) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(result);
        }
    }
}

/// The future returned by [`crate::ClientBuffer::get_pages`].
///
/// Resolves immediately if the buffer already had an answer ready; otherwise resolves once the
/// installed [`PendingRead`] is completed by a subsequent enqueue, `setNoMorePages`, or `destroy`.
pub struct GetPagesFuture<P> {
    task_instance_id: Arc<str>,
    sequence_id: u64,
    receiver: oneshot::Receiver<BufferResult<P>>,
}

impl<P> Future for GetPagesFuture<P>
where
    P: SerializedChunk,
{
    type Output = BufferResult<P>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The sender side was dropped without completing us -- this only happens if the
            // buffer itself was torn down without going through `destroy`/`force_destroy`. Treat
            // it the same as an abandoned read: an empty, not-finished result.
            Poll::Ready(Err(_)) => Poll::Ready(BufferResult::empty(
                Arc::clone(&self.task_instance_id),
                self.sequence_id,
                false,
            )),
            Poll::Pending => Poll::Pending,
        }
    }
}
