use metrics::{counter, gauge};

use crate::cast_utils::u64_to_f64_safe;

/// A crate-local stand-in for the surrounding module's `InternalEvent` abstraction: a struct
/// carrying the context for one observable occurrence, whose `emit` records it as metrics (and,
/// where useful, a trace line).
pub(crate) trait InternalEvent {
    fn emit(self);
}

pub(crate) fn emit(event: impl InternalEvent) {
    event.emit();
}

pub(crate) struct PagesEnqueued {
    pub buffer_id: String,
    pub count: u64,
    pub byte_size: u64,
}

impl InternalEvent for PagesEnqueued {
    fn emit(self) {
        trace!(message = "Enqueued pages into client buffer.", buffer_id = %self.buffer_id, count = self.count, byte_size = self.byte_size);
        counter!("client_buffer_pages_enqueued_total", "buffer_id" => self.buffer_id.clone())
            .increment(self.count);
        counter!("client_buffer_bytes_enqueued_total", "buffer_id" => self.buffer_id)
            .increment(self.byte_size);
    }
}

pub(crate) struct PagesDelivered {
    pub buffer_id: String,
    pub count: u64,
    pub byte_size: u64,
}

impl InternalEvent for PagesDelivered {
    fn emit(self) {
        trace!(message = "Delivered pages to client.", buffer_id = %self.buffer_id, count = self.count, byte_size = self.byte_size);
        counter!("client_buffer_pages_delivered_total", "buffer_id" => self.buffer_id.clone())
            .increment(self.count);
        counter!("client_buffer_bytes_delivered_total", "buffer_id" => self.buffer_id)
            .increment(self.byte_size);
    }
}

pub(crate) struct PagesAcknowledged {
    pub buffer_id: String,
    pub count: u64,
    pub byte_size: u64,
}

impl InternalEvent for PagesAcknowledged {
    fn emit(self) {
        trace!(message = "Acknowledged pages.", buffer_id = %self.buffer_id, count = self.count, byte_size = self.byte_size);
        counter!("client_buffer_pages_acknowledged_total", "buffer_id" => self.buffer_id.clone())
            .increment(self.count);
        counter!("client_buffer_bytes_acknowledged_total", "buffer_id" => self.buffer_id)
            .increment(self.byte_size);
    }
}

pub(crate) struct BufferDestroyed {
    pub buffer_id: String,
    pub bytes_reclaimed: u64,
    pub forced: bool,
}

impl InternalEvent for BufferDestroyed {
    fn emit(self) {
        debug!(
            message = "Client buffer destroyed.",
            buffer_id = %self.buffer_id,
            bytes_reclaimed = self.bytes_reclaimed,
            forced = self.forced,
        );
        counter!("client_buffer_destroyed_total",
            "buffer_id" => self.buffer_id,
            "forced" => self.forced.to_string()
        )
        .increment(1);
    }
}

/// Emitted periodically by the usage reporter; a gauge rather than a counter since it describes a
/// current level, not an accumulating total.
pub(crate) struct BufferedBytesUpdated {
    pub buffer_id: String,
    pub buffered_bytes: u64,
}

impl InternalEvent for BufferedBytesUpdated {
    fn emit(self) {
        gauge!("client_buffer_buffered_bytes", "buffer_id" => self.buffer_id)
            .set(u64_to_f64_safe(self.buffered_bytes));
    }
}
