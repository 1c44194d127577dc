/// Errors that can occur while decoding a frame payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload was empty.
    #[error("empty payload")]
    Empty,

    /// The payload does not start with any known image signature.
    #[error("unrecognized image data ({len} bytes, starts with {prefix})")]
    UnknownFormat { len: usize, prefix: String },

    /// The image format was recognized but is not enabled.
    #[error("image format {0} is not accepted")]
    Unsupported(&'static str),

    /// The image exceeds the configured dimension or allocation limits.
    #[error("image exceeds decoder limits: {0}")]
    LimitExceeded(String),

    /// The image data is corrupt or truncated.
    #[error("malformed {format} image: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    /// Reading from the in-memory payload failed.
    #[error("decode I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
