//! Raster image decoding for received camera frames.
//!
//! A completed frame is just bytes; this crate decides whether those bytes
//! form an image. Decoding failures are ordinary values here: the session
//! reports them and keeps listening for the next frame.

pub mod config;
pub mod decoded;
pub mod decoder;
pub mod error;

pub use config::DecoderConfig;
pub use decoded::{format_name, DecodedImage, ImageInfo};
pub use decoder::{sniff_format, ImageDecoder, RasterDecoder};
pub use error::{DecodeError, Result};
pub use image::ImageFormat;
