/// Errors that can occur while setting up a receive session.
///
/// Once a session runs, nothing is returned as an error: stream failures
/// end the session and show up as its [`Termination`](crate::Termination).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] camlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] camlink_frame::FrameError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn receive worker: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
