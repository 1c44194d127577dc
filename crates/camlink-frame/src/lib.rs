//! Length-prefixed image framing for camera links.
//!
//! Every image travels as a 4-byte little-endian length followed by exactly
//! that many bytes of encoded image data. A zero length is a keep-alive.
//! The [`FrameReceiver`] turns a blocking byte stream back into payloads,
//! handling partial reads internally, and the [`FrameWriter`] produces the
//! same stream on the camera side.

pub mod codec;
pub mod error;
pub mod receiver;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::ImageFrameCodec;
pub use codec::{
    decode_frame, encode_frame, encode_header, FrameConfig, Header, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAX_DECLARED_LEN,
};
pub use error::{FrameError, Result};
pub use receiver::{FrameReceiver, ReceiverState, ReceiverStats};
pub use writer::FrameWriter;
