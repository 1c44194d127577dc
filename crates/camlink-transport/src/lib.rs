//! Closable byte-stream transports for camera image links.
//!
//! The frame receiver only needs two things from its environment: a
//! blocking byte stream to read from, and a way to close that stream from
//! another thread so a blocked read wakes up. This crate provides both:
//! - [`ByteStream`] over Unix domain sockets or TCP
//! - [`CloseHandle`], an idempotent cross-thread close
//!
//! A Bluetooth RFCOMM link reaches the receiver through one of these (for
//! example bridged with `socat` from `/dev/rfcomm0`).

pub mod close;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use close::CloseHandle;
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::{connect, StreamListener};
pub use stream::ByteStream;

#[cfg(unix)]
pub use uds::UnixSocketListener;
