use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;

/// One successfully decoded frame.
///
/// Keeps the encoded bytes exactly as received so consumers can store or
/// forward the original file, alongside the size metadata and, when the
/// decoder was configured to keep them, the decoded pixels.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    encoded: Bytes,
    format: Option<ImageFormat>,
    width: u32,
    height: u32,
    pixels: Option<DynamicImage>,
}

impl DecodedImage {
    /// Build an image from its encoded bytes and metadata.
    pub fn new(encoded: Bytes, format: Option<ImageFormat>, width: u32, height: u32) -> Self {
        Self {
            encoded,
            format,
            width,
            height,
            pixels: None,
        }
    }

    /// Attach decoded pixels.
    pub fn with_pixels(mut self, pixels: DynamicImage) -> Self {
        self.pixels = Some(pixels);
        self
    }

    /// The encoded payload as received on the wire.
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// Detected container format, if known.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decoded pixels, if kept.
    pub fn pixels(&self) -> Option<&DynamicImage> {
        self.pixels.as_ref()
    }

    /// Take the decoded pixels out, leaving metadata in place.
    pub fn take_pixels(&mut self) -> Option<DynamicImage> {
        self.pixels.take()
    }

    /// Preferred file extension for the encoded bytes.
    pub fn extension(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Jpeg) => "jpg",
            Some(other) => other.extensions_str().first().copied().unwrap_or("bin"),
            None => "bin",
        }
    }

    /// Serializable summary of this image.
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            format: format_name(self.format),
            width: self.width,
            height: self.height,
            encoded_len: self.encoded.len(),
        }
    }
}

/// Metadata of a decoded image, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub format: &'static str,
    pub width: u32,
    pub height: u32,
    pub encoded_len: usize,
}

/// Lowercase name for an image format.
pub fn format_name(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Jpeg) => "jpeg",
        Some(ImageFormat::Png) => "png",
        Some(ImageFormat::Bmp) => "bmp",
        Some(ImageFormat::Gif) => "gif",
        Some(ImageFormat::WebP) => "webp",
        Some(other) => other.extensions_str().first().copied().unwrap_or("other"),
        None => "unknown",
    }
}
