use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// `tokio_util` codec for the image frame wire format.
///
/// Decoding yields raw payloads and skips keep-alive headers; decoding an
/// oversize declaration is an error, which ends a `FramedRead` stream.
#[derive(Debug, Clone)]
pub struct ImageFrameCodec {
    max_payload_size: usize,
}

impl ImageFrameCodec {
    /// Codec with the default 16 MiB payload limit.
    pub fn new() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Codec taking its limit from a [`FrameConfig`].
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }
}

impl Default for ImageFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ImageFrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            // A dangling partial frame at EOF is dropped, same as the blocking receiver.
            None => {
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for ImageFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(&item, dst)
    }
}
