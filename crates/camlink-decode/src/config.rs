use image::ImageFormat;

/// Controls raster decoding behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Largest accepted image width in pixels.
    pub max_width: u32,
    /// Largest accepted image height in pixels.
    pub max_height: u32,
    /// Largest allocation the decoder may make, in bytes.
    pub max_alloc: u64,
    /// Keep decoded pixels on the [`DecodedImage`](crate::DecodedImage).
    /// When false only the metadata and encoded bytes are kept.
    pub keep_pixels: bool,
    /// Formats the decoder accepts.
    pub formats: Vec<ImageFormat>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_width: 8192,
            max_height: 8192,
            max_alloc: 256 * 1024 * 1024,
            keep_pixels: true,
            formats: vec![ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp],
        }
    }
}

impl DecoderConfig {
    pub(crate) fn limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}
