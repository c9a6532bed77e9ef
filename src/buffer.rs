use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{Instrument, Span};

use crate::{
    error::{self, Error},
    id::ClientBufferId,
    internal_events::{
        self, BufferDestroyed, BufferedBytesUpdated, PagesAcknowledged, PagesDelivered,
        PagesEnqueued,
    },
    page_ref::{PageRef, SerializedChunk},
    pending_read::{GetPagesFuture, PendingRead},
    result::{BufferInfo, BufferResult, PageBufferInfo},
    spawn_named,
};

struct State<P> {
    pages: VecDeque<PageRef<P>>,
    no_more_pages: bool,
    pending_read: Option<PendingRead<P>>,
}

/// The per-client output buffer.
///
/// Producers call [`ClientBuffer::enqueue_pages`]; the single remote consumer polls via
/// [`ClientBuffer::get_pages`], acknowledging earlier pages implicitly by the sequence id it
/// quotes. [`ClientBuffer::set_no_more_pages`] marks the natural end of the stream;
/// [`ClientBuffer::destroy`]/[`ClientBuffer::force_destroy`] tear the buffer down. All of these
/// operations, other than `get_pages`, are synchronous and never suspend.
pub struct ClientBuffer<P> {
    id: ClientBufferId,
    task_instance_id: Arc<str>,
    state: Mutex<State<P>>,
    current_sequence_id: AtomicU64,
    buffered_bytes: AtomicU64,
    destroyed: AtomicBool,
    is_force_destroy: AtomicBool,
    prefer_local: AtomicBool,
}

impl<P> ClientBuffer<P>
where
    P: SerializedChunk,
{
    /// Creates a new, empty buffer for the given identity, starting at sequence id zero.
    pub fn new(id: ClientBufferId) -> Self {
        let task_instance_id = Arc::clone(id.task_instance_id());

        Self {
            id,
            task_instance_id,
            state: Mutex::new(State {
                pages: VecDeque::new(),
                no_more_pages: false,
                pending_read: None,
            }),
            current_sequence_id: AtomicU64::new(0),
            buffered_bytes: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
            is_force_destroy: AtomicBool::new(false),
            prefer_local: AtomicBool::new(false),
        }
    }

    /// The identity of this buffer.
    pub fn id(&self) -> &ClientBufferId {
        &self.id
    }

    /// A hint, consumed only by the enclosing manager, for whether this client prefers being
    /// scheduled on a worker local to the producing task. Has no effect on buffer semantics.
    pub fn prefer_local(&self) -> bool {
        self.prefer_local.load(Ordering::Relaxed)
    }

    /// Sets the `prefer_local` hint. See [`ClientBuffer::prefer_local`].
    pub fn set_prefer_local(&self, value: bool) {
        self.prefer_local.store(value, Ordering::Relaxed);
    }

    /// Lock-free read of whether this buffer has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Lock-free read of whether this buffer's teardown was operator-initiated (for memory
    /// reclamation) rather than client-initiated.
    pub fn is_force_destroy(&self) -> bool {
        self.is_force_destroy.load(Ordering::Acquire)
    }

    /// A lock-free observability snapshot.
    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            buffer_id: self.id.buffer_id(),
            destroyed: self.destroyed.load(Ordering::Acquire),
            page_buffer_info: PageBufferInfo {
                buffer_id: self.id.buffer_id(),
                buffered_bytes: self.buffered_bytes.load(Ordering::Acquire),
            },
        }
    }

    /// Enqueues pages produced upstream.
    ///
    /// The caller has already arranged for this buffer to own one reference on each ref (i.e.
    /// `add_reference` has *not* been called on the buffer's behalf yet); this call does so
    /// before taking ownership, matching fan-out semantics where the same ref may be enqueued
    /// into several buffers.
    ///
    /// Silently drops the refs, without referencing or releasing them, if this buffer has
    /// already seen `set_no_more_pages` or `force_destroy` -- producers racing a client's final
    /// read must not be punished for it.
    pub fn enqueue_pages(&self, refs: Vec<PageRef<P>>) -> Result<(), Error> {
        if refs.is_empty() {
            return Ok(());
        }

        let completed = {
            let mut state = self.state.lock();

            if state.no_more_pages || self.is_force_destroy.load(Ordering::Acquire) {
                return Ok(());
            }

            let mut added_bytes = 0u64;
            for page_ref in &refs {
                if let Err(error) = page_ref.add_reference() {
                    debug_assert!(false, "enqueue_pages: add_reference failed: {error}");
                    drop(state);
                    return Err(self.poison(error));
                }
                added_bytes += page_ref.retained_size_in_bytes();
            }
            let added_count = refs.len() as u64;
            state.pages.extend(refs);
            self.buffered_bytes.fetch_add(added_bytes, Ordering::AcqRel);

            internal_events::emit(PagesEnqueued {
                buffer_id: self.id.to_string(),
                count: added_count,
                byte_size: added_bytes,
            });

            state.pending_read.take().map(|pending| {
                let seq = pending.sequence_id();
                let max_bytes = pending.max_bytes();
                let outcome = self.process_locked(&mut state, seq, max_bytes);
                (pending, outcome)
            })
        };

        if let Some((pending, outcome)) = completed {
            match outcome {
                Ok(result) => {
                    self.note_delivery(&result);
                    pending.complete_with(result);
                }
                Err(error) => {
                    drop(pending);
                    return Err(self.poison(error));
                }
            }
        }

        Ok(())
    }

    /// Reads pages starting at `sequence_id`, up to a soft `max_bytes` ceiling.
    ///
    /// First acknowledges everything below `sequence_id` (see [`ClientBuffer::acknowledge`]).
    /// Then, if data is already available -- or the buffer is drained, or the caller is asking
    /// for something other than the current head -- resolves immediately. Otherwise installs a
    /// pending read and suspends until a producer, `set_no_more_pages`, or `destroy` completes
    /// it. Installing a new pending read always cancels (with an empty result) whatever pending
    /// read was previously outstanding.
    pub async fn get_pages(
        &self,
        sequence_id: u64,
        max_bytes: u64,
    ) -> Result<BufferResult<P>, Error> {
        self.acknowledge(sequence_id)?;

        enum Next<P> {
            Ready(BufferResult<P>),
            Install(GetPagesFuture<P>),
            Poison(Error),
        }

        let (next, abandoned) = {
            let mut state = self.state.lock();
            let abandoned = state.pending_read.take();

            let current = self.current_sequence_id.load(Ordering::Acquire);
            let ready = !state.pages.is_empty() || state.no_more_pages || sequence_id != current;

            let next = if ready {
                match self.process_locked(&mut state, sequence_id, max_bytes) {
                    Ok(result) => Next::Ready(result),
                    Err(error) => Next::Poison(error),
                }
            } else {
                let (pending, future) = PendingRead::new(
                    Arc::clone(&self.task_instance_id),
                    sequence_id,
                    max_bytes,
                );
                state.pending_read = Some(pending);
                Next::Install(future)
            };

            (next, abandoned)
        };

        if let Some(abandoned) = abandoned {
            abandoned.complete_with_empty();
        }

        let result = match next {
            Next::Ready(result) => result,
            Next::Install(future) => future.await,
            Next::Poison(error) => return Err(self.poison(error)),
        };

        self.note_delivery(&result);
        Ok(result)
    }

    /// Marks that no further pages will be enqueued. Idempotent.
    pub fn set_no_more_pages(&self) {
        let completed = {
            let mut state = self.state.lock();
            if state.no_more_pages {
                return;
            }
            state.no_more_pages = true;

            state.pending_read.take().map(|pending| {
                let seq = pending.sequence_id();
                let max_bytes = pending.max_bytes();
                let outcome = self.process_locked(&mut state, seq, max_bytes);
                (pending, outcome)
            })
        };

        if let Some((pending, outcome)) = completed {
            match outcome {
                Ok(result) => {
                    self.note_delivery(&result);
                    pending.complete_with(result);
                }
                Err(error) => {
                    drop(pending);
                    let _ = self.poison(error);
                }
            }
        }
    }

    /// Client-observed end-of-life: tears the buffer down and completes any pending read with an
    /// empty result. Idempotent.
    pub fn destroy(&self) {
        self.destroy_internal(false);
    }

    /// Operator-initiated teardown (e.g. memory pressure). Unlike [`ClientBuffer::destroy`], a
    /// pending read is *not* completed here -- it is left for whoever is driving the force
    /// destroy to resolve, so that the client's view of completion stays distinct from internal
    /// reclamation. If nobody else completes it, dropping the buffer naturally resolves it to an
    /// empty, not-finished result. Idempotent.
    pub fn force_destroy(&self) {
        self.destroy_internal(true);
    }

    fn destroy_internal(&self, forced: bool) {
        let (drained, pending) = {
            let mut state = self.state.lock();
            if self.destroyed.load(Ordering::Acquire) {
                return;
            }

            let drained: Vec<_> = state.pages.drain(..).collect();
            state.no_more_pages = true;
            let pending = state.pending_read.take();

            self.buffered_bytes.store(0, Ordering::Release);
            self.destroyed.store(true, Ordering::Release);
            if forced {
                self.is_force_destroy.store(true, Ordering::Release);
            }

            (drained, pending)
        };

        let bytes_reclaimed: u64 = drained.iter().map(PageRef::retained_size_in_bytes).sum();

        for page_ref in &drained {
            // A release failing here means some caller double-released a page ref before
            // destruction; the buffer is already being torn down, so there's nothing further
            // to poison.
            let _ = page_ref.release();
        }

        internal_events::emit(BufferDestroyed {
            buffer_id: self.id.to_string(),
            bytes_reclaimed,
            forced,
        });

        if !forced {
            if let Some(pending) = pending {
                pending.complete_with_empty();
            }
        }
    }

    /// Tears the buffer down in response to an `Illegal` invariant violation and returns the
    /// [`Error::Internal`] the caller should see.
    ///
    /// In debug builds the originating call site already aborts via `debug_assert!` before this is
    /// reached. In release builds the buffer's bookkeeping can no longer be trusted past this
    /// point, so it is marked destroyed and drained exactly like [`ClientBuffer::destroy`], and
    /// `source`'s detail is folded into a generic error. Must not be called while holding
    /// `state`'s lock.
    fn poison(&self, source: Error) -> Error {
        error!(
            message = "Poisoning client buffer after an invariant violation.",
            buffer_id = %self.id,
            error = %source,
        );
        self.destroy_internal(false);
        error::InternalSnafu {
            message: source.to_string(),
        }
        .build()
    }

    /// Acknowledges all pages with an id strictly below `sequence_id`: removes them from the
    /// queue and releases each exactly once, outside of the buffer lock. A no-op if the buffer is
    /// already destroyed, or if `sequence_id` is at or below the current sequence id (duplicate or
    /// stale ack).
    fn acknowledge(&self, sequence_id: u64) -> Result<(), Error> {
        let removed = {
            let mut state = self.state.lock();

            if self.destroyed.load(Ordering::Acquire) {
                return Ok(());
            }

            let old = self.current_sequence_id.load(Ordering::Acquire);
            if sequence_id <= old {
                return Ok(());
            }

            let count = sequence_id - old;
            if count > state.pages.len() as u64 {
                return error::AcknowledgeBeyondQueueSnafu {
                    sequence_id,
                    requested: count,
                    available: state.pages.len(),
                }
                .fail();
            }

            // Validate against `buffered_bytes` before touching `pages`/`current_sequence_id`: once
            // those are mutated there is no way to undo it, so the bounds check has to happen on a
            // plain peek over the pages we are about to remove.
            let bytes_removed: u64 = state
                .pages
                .iter()
                .take(count as usize)
                .map(PageRef::retained_size_in_bytes)
                .sum();
            let buffered_bytes = self.buffered_bytes.load(Ordering::Acquire);
            if bytes_removed > buffered_bytes {
                debug_assert!(
                    false,
                    "acknowledge({sequence_id}) would drive bufferedBytes negative: removing \
                     {bytes_removed} from {buffered_bytes}"
                );
                let error = error::NegativeBufferedBytesSnafu {
                    buffered_bytes,
                    bytes_removed,
                }
                .build();
                drop(state);
                return Err(self.poison(error));
            }

            let mut removed = Vec::with_capacity(count as usize);
            for _ in 0..count {
                removed.push(
                    state
                        .pages
                        .pop_front()
                        .expect("count was already checked against pages.len()"),
                );
            }

            self.current_sequence_id.store(sequence_id, Ordering::Release);
            self.buffered_bytes.fetch_sub(bytes_removed, Ordering::AcqRel);

            internal_events::emit(PagesAcknowledged {
                buffer_id: self.id.to_string(),
                count,
                byte_size: bytes_removed,
            });

            removed
        };

        for page_ref in &removed {
            if let Err(error) = page_ref.release() {
                debug_assert!(false, "acknowledge: release failed: {error}");
                return Err(self.poison(error));
            }
        }

        Ok(())
    }

    /// The read-side selection algorithm. Must be called with `state`'s lock held.
    fn process_locked(
        &self,
        state: &mut State<P>,
        sequence_id: u64,
        max_bytes: u64,
    ) -> Result<BufferResult<P>, Error> {
        let current = self.current_sequence_id.load(Ordering::Acquire);

        if sequence_id < current {
            return Ok(BufferResult::empty(
                Arc::clone(&self.task_instance_id),
                sequence_id,
                false,
            ));
        }

        if state.pages.is_empty() && state.no_more_pages {
            return Ok(BufferResult::empty(
                Arc::clone(&self.task_instance_id),
                current,
                true,
            ));
        }

        if sequence_id > current {
            debug_assert!(
                false,
                "process() called with sequence id {sequence_id} ahead of current sequence id {current}"
            );
            return error::FutureRequestSnafu {
                sequence_id,
                current_sequence_id: current,
            }
            .fail();
        }

        let mut pages = Vec::new();
        let mut accumulated = 0u64;
        for page_ref in &state.pages {
            let size = page_ref.retained_size_in_bytes();
            if !pages.is_empty() && accumulated.saturating_add(size) > max_bytes {
                break;
            }
            pages.push(page_ref.payload());
            accumulated += size;
        }

        let delivered = pages.len() as u64;
        Ok(BufferResult {
            task_instance_id: Arc::clone(&self.task_instance_id),
            start_token: sequence_id,
            next_token: sequence_id + delivered,
            finished: false,
            pages,
        })
    }

    fn note_delivery(&self, result: &BufferResult<P>) {
        if result.pages.is_empty() {
            return;
        }
        internal_events::emit(PagesDelivered {
            buffer_id: self.id.to_string(),
            count: result.pages.len() as u64,
            byte_size: result.size_in_bytes(),
        });
    }
}

impl<P> ClientBuffer<P>
where
    P: SerializedChunk + 'static,
{
    /// Spawns a background task that periodically emits a `buffered_bytes` gauge, the way the
    /// surrounding module's buffer usage reporter does for its own stages. Stops once the buffer
    /// is destroyed.
    pub fn install_usage_reporter(self: &Arc<Self>, span: Span) {
        let buffer = Arc::clone(self);
        let buffer_id = self.id.to_string();
        let task_name = format!("client buffer usage reporter ({buffer_id})");

        let task = async move {
            let mut interval = tokio::time::interval(Duration::from_secs(2));
            loop {
                interval.tick().await;

                internal_events::emit(BufferedBytesUpdated {
                    buffer_id: buffer_id.clone(),
                    buffered_bytes: buffer.buffered_bytes.load(Ordering::Acquire),
                });

                if buffer.is_destroyed() {
                    break;
                }
            }
        };

        spawn_named(task.instrument(span.or_current()), task_name.as_str());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_pending, assert_ready, task::spawn};

    use super::*;

    struct TestPage {
        bytes: u64,
        rows: u32,
    }

    impl SerializedChunk for TestPage {
        fn position_count(&self) -> u32 {
            self.rows
        }

        fn retained_size_in_bytes(&self) -> u64 {
            self.bytes
        }
    }

    fn page_ref(bytes: u64, rows: u32) -> PageRef<TestPage> {
        PageRef::new(TestPage { bytes, rows }, 1, || {}).unwrap()
    }

    fn page_ref_tracked(bytes: u64, released: &Arc<std::sync::atomic::AtomicUsize>) -> PageRef<TestPage> {
        let released = Arc::clone(released);
        PageRef::new(TestPage { bytes, rows: 1 }, 1, move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap()
    }

    fn buffer() -> ClientBuffer<TestPage> {
        ClientBuffer::new(ClientBufferId::new("task-1", 0))
    }

    #[tokio::test]
    async fn basic_stream_scenario() {
        let buf = buffer();
        let p0 = page_ref(100, 10);
        let p1 = page_ref(200, 5);
        buf.enqueue_pages(vec![p0, p1]).unwrap();

        let result = buf.get_pages(0, 1024).await.unwrap();
        assert_eq!(0, result.start_token);
        assert_eq!(2, result.next_token);
        assert!(!result.finished);
        assert_eq!(2, result.pages.len());

        let mut pending = spawn(buf.get_pages(2, 1024));
        assert_pending!(pending.poll());

        buf.set_no_more_pages();
        assert!(pending.is_woken());
        let result = assert_ready!(pending.poll()).unwrap();
        assert_eq!(2, result.start_token);
        assert_eq!(2, result.next_token);
        assert!(result.finished);
        assert!(result.pages.is_empty());

        buf.destroy();
        assert!(buf.is_destroyed());
    }

    #[tokio::test]
    async fn retry_returns_same_result() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(100, 1), page_ref(200, 1)])
            .unwrap();

        let first = buf.get_pages(0, 1024).await.unwrap();
        let second = buf.get_pages(0, 1024).await.unwrap();
        assert_eq!(first.next_token, second.next_token);
        assert_eq!(first.pages.len(), second.pages.len());

        let mut pending = spawn(buf.get_pages(2, 1024));
        assert_pending!(pending.poll());

        buf.enqueue_pages(vec![page_ref(50, 1)]).unwrap();
        assert!(pending.is_woken());
        let result = assert_ready!(pending.poll()).unwrap();
        assert_eq!(2, result.start_token);
        assert_eq!(3, result.next_token);
        assert_eq!(1, result.pages.len());
    }

    #[tokio::test]
    async fn byte_cap_splits_across_reads() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(600, 1), page_ref(600, 1), page_ref(600, 1)])
            .unwrap();

        let result = buf.get_pages(0, 1000).await.unwrap();
        assert_eq!(0, result.start_token);
        assert_eq!(1, result.next_token);
        assert_eq!(1, result.pages.len());

        let result = buf.get_pages(1, 1000).await.unwrap();
        assert_eq!(1, result.start_token);
        assert_eq!(2, result.next_token);
        assert_eq!(1, result.pages.len());
    }

    #[tokio::test]
    async fn oversize_page_still_delivered() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(10_000, 1)]).unwrap();

        let result = buf.get_pages(0, 1024).await.unwrap();
        assert_eq!(0, result.start_token);
        assert_eq!(1, result.next_token);
        assert_eq!(1, result.pages.len());
    }

    #[tokio::test]
    async fn max_bytes_zero_returns_one_page() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(1, 1), page_ref(1, 1)])
            .unwrap();

        let result = buf.get_pages(0, 0).await.unwrap();
        assert_eq!(1, result.pages.len());
    }

    #[tokio::test]
    async fn force_destroy_mid_stream() {
        let buf = buffer();
        let released = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let p0 = page_ref_tracked(100, &released);
        let p1 = page_ref_tracked(200, &released);
        // Keep the producer's own handle to each ref and drop it right after fan-out, the way the
        // enclosing manager would once every buffer it's routing to has taken its own reference.
        let p0_producer = p0.clone();
        let p1_producer = p1.clone();
        buf.enqueue_pages(vec![p0, p1]).unwrap();
        p0_producer.release().unwrap();
        p1_producer.release().unwrap();

        // Client acknowledges through 1 by reading starting at 1.
        let _ = buf.get_pages(1, 1024).await.unwrap();
        assert_eq!(1, released.load(Ordering::SeqCst));

        buf.force_destroy();
        assert_eq!(2, released.load(Ordering::SeqCst));
        assert!(buf.info().destroyed);
        assert_eq!(0, buf.info().page_buffer_info.buffered_bytes);

        // Enqueues after force-destroy are silently dropped.
        let dropped = page_ref_tracked(50, &released);
        buf.enqueue_pages(vec![dropped]).unwrap();
        assert_eq!(2, released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fan_out_across_buffers_releases_exactly_once() {
        let released = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let shared = page_ref_tracked(100, &released);

        let buf_a = buffer();
        let buf_b = buffer();

        // Fan out to two independent buffers: each takes its own reference on a clone of the
        // shared handle.
        buf_a.enqueue_pages(vec![shared.clone()]).unwrap();
        buf_b.enqueue_pages(vec![shared.clone()]).unwrap();
        // The producer's own construction-time reference is released once fan-out is complete.
        shared.release().unwrap();
        assert_eq!(0, released.load(Ordering::SeqCst));

        buf_a.destroy();
        assert_eq!(0, released.load(Ordering::SeqCst));

        buf_b.destroy();
        assert_eq!(1, released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stale_ack_is_a_no_op() {
        let buf = buffer();
        let pages = (0..5).map(|_| page_ref(10, 1)).collect();
        buf.enqueue_pages(pages).unwrap();
        let _ = buf.get_pages(5, 1024).await.unwrap();

        let result = buf.get_pages(3, 1024).await.unwrap();
        assert_eq!(3, result.start_token);
        assert_eq!(3, result.next_token);
        assert!(!result.finished);
    }

    #[tokio::test]
    async fn empty_enqueue_is_a_no_op() {
        let buf = buffer();
        buf.enqueue_pages(Vec::new()).unwrap();
        assert_eq!(0, buf.info().page_buffer_info.buffered_bytes);
    }

    #[tokio::test]
    async fn get_pages_on_freshly_destroyed_buffer_is_finished() {
        let buf = buffer();
        buf.destroy();

        let result = buf.get_pages(0, 1024).await.unwrap();
        assert_eq!(0, result.start_token);
        assert_eq!(0, result.next_token);
        assert!(result.finished);
    }

    #[tokio::test]
    async fn acknowledge_past_destroyed_buffer_is_a_no_op() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(10, 1)]).unwrap();
        buf.destroy();

        let result = buf.get_pages(100, 1024).await.unwrap();
        assert!(result.finished);
    }

    #[tokio::test]
    async fn ack_draining_exact_queue_length_then_finished() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(10, 1), page_ref(20, 1)])
            .unwrap();
        buf.set_no_more_pages();

        // Acknowledge exactly through the end of the queue.
        let result = buf.get_pages(2, 1024).await.unwrap();
        assert_eq!(2, result.start_token);
        assert_eq!(2, result.next_token);
        assert!(result.finished);
    }

    #[tokio::test]
    async fn new_read_abandons_prior_pending_read() {
        let buf = buffer();

        let mut first = spawn(buf.get_pages(0, 1024));
        assert_pending!(first.poll());

        // A second read at the same token installs a fresh pending read and completes the first
        // one with an empty, not-finished result.
        let mut second = spawn(buf.get_pages(0, 1024));
        assert_pending!(second.poll());

        assert!(first.is_woken());
        let abandoned = assert_ready!(first.poll()).unwrap();
        assert_eq!(0, abandoned.start_token);
        assert_eq!(0, abandoned.next_token);
        assert!(!abandoned.finished);

        buf.enqueue_pages(vec![page_ref(10, 1)]).unwrap();
        assert!(second.is_woken());
        let result = assert_ready!(second.poll()).unwrap();
        assert_eq!(1, result.pages.len());
    }

    #[test]
    fn prefer_local_is_a_plain_hint() {
        let buf = buffer();
        assert!(!buf.prefer_local());
        buf.set_prefer_local(true);
        assert!(buf.prefer_local());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let buf = buffer();
        buf.enqueue_pages(vec![page_ref(10, 1)]).unwrap();
        buf.destroy();
        buf.destroy();
        assert!(buf.is_destroyed());
    }

    #[tokio::test]
    async fn set_no_more_pages_is_idempotent() {
        let buf = buffer();
        buf.set_no_more_pages();
        buf.set_no_more_pages();

        let result = buf.get_pages(0, 1024).await.unwrap();
        assert!(result.finished);
    }
}
