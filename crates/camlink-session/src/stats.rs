use std::sync::atomic::{AtomicU64, Ordering};

use camlink_frame::ReceiverStats;
use serde::Serialize;

/// Point-in-time counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Frames completed on the wire (keep-alives excluded).
    pub frames_received: u64,
    /// Frames that decoded and were handed to the sink.
    pub images_delivered: u64,
    /// Frames that completed but failed to decode.
    pub decode_failures: u64,
    /// Zero and negative headers skipped.
    pub keepalives: u64,
    /// Bytes read from the stream, headers included.
    pub bytes_received: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SharedStats {
    frames_received: AtomicU64,
    images_delivered: AtomicU64,
    decode_failures: AtomicU64,
    keepalives: AtomicU64,
    bytes_received: AtomicU64,
}

impl SharedStats {
    pub(crate) fn sync_receiver(&self, stats: &ReceiverStats) {
        self.frames_received.store(stats.frames, Ordering::Relaxed);
        self.keepalives.store(stats.keepalives, Ordering::Relaxed);
        self.bytes_received.store(stats.bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.images_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            images_delivered: self.images_delivered.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            keepalives: self.keepalives.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}
