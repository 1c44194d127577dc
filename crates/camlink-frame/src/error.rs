/// Errors that can occur while framing or receiving images.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared or supplied payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An image frame must carry at least one byte; zero is the keep-alive.
    #[error("image payload must not be empty")]
    EmptyPayload,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended at (or inside) a frame header.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended before the declared payload was complete.
    #[error("connection closed mid-frame ({received} of {declared} bytes)")]
    Truncated { declared: usize, received: usize },

    /// The receiver already reached its terminal state.
    #[error("receiver terminated")]
    Terminated,
}

pub type Result<T> = std::result::Result<T, FrameError>;
