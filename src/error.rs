use snafu::Snafu;

/// Errors that can occur while operating a [`crate::PageRef`] or [`crate::ClientBuffer`].
///
/// Variants are grouped into three rough categories, mirroring the taxonomy the surrounding
/// module uses: invalid arguments supplied by a caller (not retryable, raised synchronously),
/// and invariant violations (programming errors in an upstream caller, which in debug builds we'd
/// rather panic on loudly than paper over, and which in release builds poison the buffer and
/// surface as [`Error::Internal`]). Benign conditions -- duplicate `destroy`, stale acks, stale
/// reads -- are not represented here at all; they are no-ops, not errors.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A [`crate::PageRef`] was constructed with a non-positive initial reference count.
    #[snafu(display("initial reference count must be at least 1, got {initial_refs}"))]
    InvalidInitialReferenceCount { initial_refs: i64 },

    /// An acknowledgement requested removing more pages than the buffer currently holds.
    #[snafu(display(
        "acknowledge({sequence_id}) would remove {requested} pages but only {available} are buffered"
    ))]
    AcknowledgeBeyondQueue {
        sequence_id: u64,
        requested: u64,
        available: usize,
    },

    /// `add_reference` was called on a [`crate::PageRef`] whose count had already reached zero.
    ///
    /// This is a resurrection bug: once a page ref's count hits zero, its payload may have
    /// already been released by the `on_release` callback, so reviving it is never safe.
    #[snafu(display(
        "attempted to add a reference to a page ref whose count was already {count}"
    ))]
    Resurrection { count: i64 },

    /// `release` was called more times than references were ever held.
    #[snafu(display("page ref reference count would go negative (post-decrement {count})"))]
    NegativeReferenceCount { count: i64 },

    /// `process` observed a requested sequence id ahead of the buffer's current sequence id.
    ///
    /// The acknowledgement protocol guarantees this never happens on a live buffer: destruction
    /// of the queue always routes through the drained case first. Seeing this means a caller
    /// skipped acknowledgement, or the buffer's internal bookkeeping has a bug.
    #[snafu(display(
        "process() called with sequence id {sequence_id} ahead of current sequence id {current_sequence_id}"
    ))]
    FutureRequest {
        sequence_id: u64,
        current_sequence_id: u64,
    },

    /// Removing acknowledged pages would have driven `buffered_bytes` negative.
    #[snafu(display(
        "bufferedBytes would go negative: removing {bytes_removed} from {buffered_bytes}"
    ))]
    NegativeBufferedBytes {
        buffered_bytes: u64,
        bytes_removed: u64,
    },

    /// An `Illegal` condition was detected in a release build. The buffer this occurred on has
    /// been poisoned -- marked destroyed and drained -- since its bookkeeping can no longer be
    /// trusted. `message` carries the originating error's own display text.
    #[snafu(display("internal invariant violation, buffer poisoned: {message}"))]
    Internal { message: String },
}

impl Error {
    /// Whether this error reflects a caller-supplied invalid argument (not retryable, but not a
    /// sign of buffer corruption either).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidInitialReferenceCount { .. } | Error::AcknowledgeBeyondQueue { .. }
        )
    }

    /// Whether this error reflects a violated invariant: a programming bug in some caller, not a
    /// condition any well-behaved caller can trigger.
    pub fn is_illegal(&self) -> bool {
        !self.is_invalid_argument()
    }
}
