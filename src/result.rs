use std::sync::Arc;

use crate::page_ref::SerializedChunk;

/// The outcome of a single `getPages` call.
///
/// `pages.len() == next_token - start_token` always holds for a non-empty result; for an empty
/// result, `next_token == start_token` and `pages` is empty.
#[derive(Debug)]
pub struct BufferResult<P> {
    pub task_instance_id: Arc<str>,
    pub start_token: u64,
    pub next_token: u64,
    pub finished: bool,
    pub pages: Vec<Arc<P>>,
}

impl<P> Clone for BufferResult<P> {
    fn clone(&self) -> Self {
        Self {
            task_instance_id: Arc::clone(&self.task_instance_id),
            start_token: self.start_token,
            next_token: self.next_token,
            finished: self.finished,
            pages: self.pages.clone(),
        }
    }
}

impl<P> BufferResult<P>
where
    P: SerializedChunk,
{
    /// Builds an empty result carrying the given `token` as both `start_token` and `next_token`.
    ///
    /// This is the result shape used for stale requests, abandoned pending reads, and the final
    /// drained read a client sees before issuing `destroy`.
    pub fn empty(task_instance_id: Arc<str>, token: u64, finished: bool) -> Self {
        Self {
            task_instance_id,
            start_token: token,
            next_token: token,
            finished,
            pages: Vec::new(),
        }
    }

    /// Total `retained_size_in_bytes` across all pages in this result.
    pub fn size_in_bytes(&self) -> u64 {
        self.pages.iter().map(|p| p.retained_size_in_bytes()).sum()
    }
}

/// A lock-free snapshot of one buffer's byte accounting, nested inside [`BufferInfo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageBufferInfo {
    pub buffer_id: u64,
    pub buffered_bytes: u64,
}

/// A lock-free observability snapshot of a [`crate::ClientBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferInfo {
    pub buffer_id: u64,
    pub destroyed: bool,
    pub page_buffer_info: PageBufferInfo,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct TestPage(u64);

    impl SerializedChunk for TestPage {
        fn position_count(&self) -> u32 {
            1
        }

        fn retained_size_in_bytes(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn empty_result_is_total() {
        let result: BufferResult<TestPage> = BufferResult::empty(Arc::from("task-1"), 42, true);
        assert_eq!(42, result.start_token);
        assert_eq!(42, result.next_token);
        assert!(result.finished);
        assert!(result.pages.is_empty());
    }

    #[test]
    fn size_in_bytes_sums_pages() {
        let result = BufferResult {
            task_instance_id: Arc::from("task-1"),
            start_token: 0,
            next_token: 2,
            finished: false,
            pages: vec![Arc::new(TestPage(100)), Arc::new(TestPage(200))],
        };
        assert_eq!(300, result.size_in_bytes());
    }
}
