use std::io::Cursor;

use bytes::Bytes;
use image::{ImageError, ImageReader};
use tracing::trace;

use crate::config::DecoderConfig;
use crate::decoded::{format_name, DecodedImage};
use crate::error::{DecodeError, Result};

/// Turns a complete frame payload into a [`DecodedImage`].
///
/// Called on the session worker thread once per completed frame.
pub trait ImageDecoder: Send {
    fn decode(&self, payload: Bytes) -> Result<DecodedImage>;
}

impl<F> ImageDecoder for F
where
    F: Fn(Bytes) -> Result<DecodedImage> + Send,
{
    fn decode(&self, payload: Bytes) -> Result<DecodedImage> {
        self(payload)
    }
}

/// Decoder for standard raster formats (JPEG, PNG, BMP) backed by `image`.
#[derive(Debug, Clone, Default)]
pub struct RasterDecoder {
    config: DecoderConfig,
}

impl RasterDecoder {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl ImageDecoder for RasterDecoder {
    fn decode(&self, payload: Bytes) -> Result<DecodedImage> {
        if payload.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut reader = ImageReader::new(Cursor::new(payload.as_ref())).with_guessed_format()?;
        let format = reader.format().ok_or_else(|| DecodeError::UnknownFormat {
            len: payload.len(),
            prefix: hex_prefix(&payload),
        })?;
        let name = format_name(Some(format));
        if !self.config.formats.contains(&format) {
            return Err(DecodeError::Unsupported(name));
        }

        reader.limits(self.config.limits());
        let pixels = reader.decode().map_err(|err| match err {
            ImageError::Limits(limit) => DecodeError::LimitExceeded(limit.to_string()),
            other => DecodeError::Malformed {
                format: name,
                message: other.to_string(),
            },
        })?;

        let (width, height) = (pixels.width(), pixels.height());
        trace!(format = name, width, height, "decoded frame");

        let image = DecodedImage::new(payload, Some(format), width, height);
        Ok(if self.config.keep_pixels {
            image.with_pixels(pixels)
        } else {
            image
        })
    }
}

/// Sniff the container format of an encoded image without decoding it.
pub fn sniff_format(data: &[u8]) -> Option<image::ImageFormat> {
    image::guess_format(data).ok()
}

fn hex_prefix(data: &[u8]) -> String {
    let mut out = String::with_capacity(3 * 8);
    for (i, byte) in data.iter().take(8).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
