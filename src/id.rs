use std::{fmt, sync::Arc};

/// Identifies a single client output buffer.
///
/// A buffer is keyed by the instance id of the task that owns it plus a small integer the
/// enclosing manager assigns to the buffer when it is created. Two buffers with the same
/// `buffer_id` but different `task_instance_id` are unrelated; the pairing only needs to be
/// unique within the manager that constructed it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientBufferId {
    task_instance_id: Arc<str>,
    buffer_id: u64,
}

impl ClientBufferId {
    /// Creates a new buffer identity.
    pub fn new(task_instance_id: impl Into<Arc<str>>, buffer_id: u64) -> Self {
        Self {
            task_instance_id: task_instance_id.into(),
            buffer_id,
        }
    }

    /// The instance id of the task that owns this buffer.
    pub fn task_instance_id(&self) -> &Arc<str> {
        &self.task_instance_id
    }

    /// The small integer identifying this buffer within its owning task.
    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }
}

impl fmt::Display for ClientBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task_instance_id, self.buffer_id)
    }
}

/// Builder for [`ClientBufferId`].
///
/// Mirrors `disk_v2`'s `DiskBufferConfigBuilder` shape: a required identity supplied up front via
/// a `from_*` constructor, with the remaining field defaulted and overridable through a setter.
/// Unlike that builder, `build` is infallible here -- there is no combination of
/// `task_instance_id`/`buffer_id` this type needs to reject.
#[derive(Clone, Debug)]
pub struct ClientBufferIdBuilder {
    task_instance_id: Arc<str>,
    buffer_id: u64,
}

impl ClientBufferIdBuilder {
    /// Starts a builder for the given owning task, with `buffer_id` defaulted to zero.
    pub fn from_task_instance_id(task_instance_id: impl Into<Arc<str>>) -> Self {
        Self {
            task_instance_id: task_instance_id.into(),
            buffer_id: 0,
        }
    }

    /// Sets the small integer identifying this buffer within its owning task.
    ///
    /// Defaults to zero.
    pub fn buffer_id(mut self, buffer_id: u64) -> Self {
        self.buffer_id = buffer_id;
        self
    }

    /// Consumes this builder and constructs a [`ClientBufferId`].
    pub fn build(self) -> ClientBufferId {
        ClientBufferId {
            task_instance_id: self.task_instance_id,
            buffer_id: self.buffer_id,
        }
    }
}
