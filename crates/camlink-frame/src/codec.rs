use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a single 4-byte little-endian payload length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default read/write chunk size, matching the ESP32-CAM firmware's writes.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Largest length a header can meaningfully declare.
///
/// The camera side reads the header as a signed 32-bit integer, so anything
/// with the top bit set is negative there and never announces a frame.
pub const MAX_DECLARED_LEN: usize = i32::MAX as usize;

/// Interpretation of one 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Declared length 0: keep-alive, no payload follows.
    KeepAlive,
    /// Declared length with the sign bit set: no payload follows.
    Negative(u32),
    /// A payload of exactly this many bytes follows.
    Payload(usize),
}

impl Header {
    /// Interpret raw header bytes.
    pub fn parse(raw: [u8; HEADER_SIZE]) -> Self {
        let declared = u32::from_le_bytes(raw);
        if declared == 0 {
            Header::KeepAlive
        } else if declared as usize > MAX_DECLARED_LEN {
            Header::Negative(declared)
        } else {
            Header::Payload(declared as usize)
        }
    }

    /// The payload length this header announces, if any.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            Header::Payload(len) => Some(len),
            Header::KeepAlive | Header::Negative(_) => None,
        }
    }
}

/// Encode a header declaring `len` payload bytes.
pub fn encode_header(len: usize, dst: &mut BytesMut) -> Result<()> {
    if len > MAX_DECLARED_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_DECLARED_LEN,
        });
    }
    dst.reserve(HEADER_SIZE);
    dst.put_u32_le(len as u32);
    Ok(())
}

/// Encode one image frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────┐
/// │ Length       │ Payload                  │
/// │ (4B LE u32)  │ (Length bytes, e.g. JPEG)│
/// └──────────────┴──────────────────────────┘
/// ```
/// There is no magic, checksum or terminator. A zero length is a keep-alive
/// and is written with [`encode_header`]`(0, ..)` instead.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    encode_header(payload.len(), dst)?;
    dst.reserve(payload.len());
    dst.put_slice(payload);
    Ok(())
}

/// Decode the next image payload from a buffer.
///
/// Keep-alive and negative headers are consumed and skipped. Returns
/// `Ok(None)` if the buffer doesn't hold a complete frame yet; on success the
/// frame bytes are consumed from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    loop {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&src[..HEADER_SIZE]);
        let len = match Header::parse(raw).payload_len() {
            Some(len) => len,
            None => {
                src.advance(HEADER_SIZE);
                continue;
            }
        };

        if len > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: max_payload,
            });
        }

        if src.len() < HEADER_SIZE + len {
            src.reserve(HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        return Ok(Some(src.split_to(len).freeze()));
    }
}

/// Configuration for framing and receiving.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted declared payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Upper bound on a single payload read. Default: 512.
    pub read_chunk_size: usize,
    /// Slice size for payload writes. Default: 512.
    pub write_chunk_size: usize,
    /// Read timeout for blocking operations. Default: none.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations. Default: none.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            write_chunk_size: DEFAULT_CHUNK_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_interpretation() {
        assert_eq!(Header::parse([0, 0, 0, 0]), Header::KeepAlive);
        assert_eq!(Header::parse([0x0A, 0, 0, 0]), Header::Payload(10));
        assert_eq!(Header::parse([0x00, 0x10, 0, 0]), Header::Payload(4096));
        assert_eq!(
            Header::parse([0xFF, 0xFF, 0xFF, 0xFF]),
            Header::Negative(u32::MAX)
        );
        assert_eq!(
            Header::parse([0, 0, 0, 0x80]),
            Header::Negative(0x8000_0000)
        );
        assert_eq!(
            Header::parse([0xFF, 0xFF, 0xFF, 0x7F]).payload_len(),
            Some(MAX_DECLARED_LEN)
        );
    }

    #[test]
    fn encode_frame_layout() {
        let mut buf = BytesMut::new();
        encode_frame(b"jpegdata!!", &mut buf).unwrap();

        assert_eq!(&buf[..HEADER_SIZE], &[0x0A, 0, 0, 0]);
        assert_eq!(&buf[HEADER_SIZE..], b"jpegdata!!");
    }

    #[test]
    fn encode_rejects_empty_payload() {
        let mut buf = BytesMut::new();
        let err = encode_frame(b"", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_header_rejects_unrepresentable_length() {
        let mut buf = BytesMut::new();
        let err = encode_header(MAX_DECLARED_LEN + 1, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x0A, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn decode_incomplete_payload_keeps_buffer() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn decode_skips_keepalives() {
        let mut buf = BytesMut::new();
        encode_header(0, &mut buf).unwrap();
        buf.put_u32_le(0x8000_0001);
        encode_frame(b"img", &mut buf).unwrap();

        let payload = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(payload.as_ref(), b"img");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_oversize_declaration() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1024);

        let err = decode_frame(&mut buf, 16).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 1024, max: 16 }
        ));
    }

    #[test]
    fn decode_back_to_back_frames_in_order() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn config_defaults() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert_eq!(cfg.read_chunk_size, 512);
        assert_eq!(cfg.write_chunk_size, 512);
        assert!(cfg.read_timeout.is_none());
    }
}
