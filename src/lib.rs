//! The per-client output buffer
//!
//! This library implements the in-memory handoff between a task producing serialized result
//! pages and the single remote consumer reading them back out: a bounded, sequence-numbered,
//! at-least-once-retryable buffer keyed by a small integer per client.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::type_complexity)] // long-types happen, especially in async code
#![allow(clippy::must_use_candidate)]

#[macro_use]
extern crate tracing;

mod buffer;
mod cast_utils;
mod error;
mod id;
mod internal_events;
mod page_ref;
mod pending_read;
mod result;

pub use buffer::ClientBuffer;
pub use error::Error;
pub use id::{ClientBufferId, ClientBufferIdBuilder};
pub use page_ref::{PageRef, SerializedChunk};
pub use pending_read::GetPagesFuture;
pub use result::{BufferInfo, BufferResult, PageBufferInfo};

use std::future::Future;

/// Spawns a future on the current runtime under the given task name.
///
/// A crate-local stand-in for the surrounding module's named-task spawning helper: naming tasks
/// makes them identifiable in runtime dumps and panic messages without pulling in the rest of
/// that module's task registry.
pub(crate) fn spawn_named<T>(task: T, name: &str) -> tokio::task::JoinHandle<T::Output>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    trace!(message = "Spawning task.", task_name = name);
    tokio::spawn(task)
}
