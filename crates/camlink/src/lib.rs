//! Receive images from ESP32-CAM style camera links.
//!
//! A camera sends each image as a 4-byte little-endian length followed by the
//! encoded image bytes over a plain byte stream (an RFCOMM socket on the
//! device, a Unix socket or TCP connection here). camlink reassembles those
//! frames, decodes them and hands the images to your code on a worker thread.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte streams, listeners and close handles (UDS, TCP)
//! - [`frame`]: wire codec, receive state machine and frame writer
//! - [`decode`]: raster decoding of completed frames (behind `session` feature)
//! - [`session`]: worker-thread receive sessions (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use camlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use camlink_frame::*;
}

/// Re-export decode types (requires `session` feature).
#[cfg(feature = "session")]
pub mod decode {
    pub use camlink_decode::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use camlink_session::*;
}
