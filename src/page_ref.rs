use std::{
    fmt,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::error::{self, Error};

/// An opaque serialized result page.
///
/// The core never inspects the bytes of a page; it only ever asks for the two sizes below, which
/// it uses for sequence-id bookkeeping (`position_count`) and memory accounting
/// (`retained_size_in_bytes`).
pub trait SerializedChunk: Send + Sync + 'static {
    /// Number of logical rows carried by this page.
    fn position_count(&self) -> u32;

    /// Approximate retained memory footprint of this page, in bytes.
    fn retained_size_in_bytes(&self) -> u64;
}

type ReleaseCallback = Box<dyn FnOnce() + Send>;

struct Inner<P> {
    page: Arc<P>,
    ref_count: AtomicI64,
    on_release: Mutex<Option<ReleaseCallback>>,
}

/// A reference-counted handle around an opaque serialized page.
///
/// Unlike a plain `Arc`, the reference count here is managed explicitly via
/// [`PageRef::add_reference`] and [`PageRef::release`] rather than implicitly via `Clone`/`Drop`.
/// This lets the same page be fanned out to multiple buffers -- each buffer calls
/// `add_reference` once when it takes ownership of a clone of the handle, and `release` exactly
/// once when it is done with it (on acknowledgement, destruction, or being silently dropped) --
/// while the release callback only runs once, when the logical count reaches zero, regardless of
/// how many `PageRef` clones still happen to be alive at that point.
pub struct PageRef<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for PageRef<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for PageRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRef")
            .field("ref_count", &self.inner.ref_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl<P> PageRef<P>
where
    P: SerializedChunk,
{
    /// Constructs a new page ref with `initial_refs` references already outstanding.
    ///
    /// `on_release` is invoked exactly once, outside of any caller-held lock, when the last
    /// reference is released.
    pub fn new<F>(page: P, initial_refs: i64, on_release: F) -> Result<Self, Error>
    where
        F: FnOnce() + Send + 'static,
    {
        if initial_refs < 1 {
            return error::InvalidInitialReferenceCountSnafu { initial_refs }.fail();
        }

        Ok(Self {
            inner: Arc::new(Inner {
                page: Arc::new(page),
                ref_count: AtomicI64::new(initial_refs),
                on_release: Mutex::new(Some(Box::new(on_release))),
            }),
        })
    }

    /// Atomically increments the reference count.
    ///
    /// Fails with [`Error::Resurrection`] if the count was already at or below zero, since the
    /// payload may already have been released.
    pub fn add_reference(&self) -> Result<(), Error> {
        let previous = self.inner.ref_count.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |count| (count > 0).then_some(count + 1),
        );

        match previous {
            Ok(_) => Ok(()),
            Err(count) => error::ResurrectionSnafu { count }.fail(),
        }
    }

    /// Atomically decrements the reference count, running the release callback exactly once if
    /// this was the last outstanding reference.
    ///
    /// Fails with [`Error::NegativeReferenceCount`] if the count was already zero; callers must
    /// never call `release` more times than they called `add_reference` (plus the one implicit
    /// reference from construction).
    pub fn release(&self) -> Result<(), Error> {
        let previous = self.inner.ref_count.fetch_sub(1, Ordering::AcqRel);
        let remaining = previous - 1;

        if remaining < 0 {
            return error::NegativeReferenceCountSnafu { count: remaining }.fail();
        }

        if remaining == 0 {
            if let Some(on_release) = self.inner.on_release.lock().take() {
                on_release();
            }
        }

        Ok(())
    }

    /// Number of logical rows carried by this page.
    pub fn position_count(&self) -> u32 {
        self.inner.page.position_count()
    }

    /// Approximate retained memory footprint of this page, in bytes.
    pub fn retained_size_in_bytes(&self) -> u64 {
        self.inner.page.retained_size_in_bytes()
    }

    /// Borrows the underlying opaque page payload.
    pub fn page(&self) -> &P {
        &self.inner.page
    }

    /// Returns a cheaply-cloneable handle to the underlying payload, suitable for handing off to
    /// a transport layer for serialization.
    pub fn payload(&self) -> Arc<P> {
        Arc::clone(&self.inner.page)
    }
}
