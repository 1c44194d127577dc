//! Receive sessions for camera frame streams.
//!
//! A [`Session`] owns one worker thread that reads length-prefixed frames,
//! decodes each completed payload and hands images to a [`FrameSink`] in
//! wire order. Decode failures are logged and skipped; stream failures end
//! the session with a [`Termination`]. Cancellation closes the stream and
//! fires a [`CancelSignal`], so a blocked read or channel send returns.

pub mod cancel;
pub mod config;
pub mod connector;
pub mod error;
pub mod listener;
pub mod session;
pub mod sink;
pub mod stats;

pub use cancel::CancelSignal;
pub use config::{SessionConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_SESSION_NAME};
pub use connector::{connect, connect_with_config};
pub use error::{Result, SessionError};
pub use listener::SessionListener;
pub use session::{Session, Termination};
pub use sink::{ChannelSink, FrameSink, ImageReceiver};
pub use stats::SessionStats;
