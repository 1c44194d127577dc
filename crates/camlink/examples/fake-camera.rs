//! Plays an ESP32-CAM: sends a few generated BMP frames with keep-alives in
//! between.
//!
//! Run with:
//!   cargo run --example fake-camera -- <endpoint>
//!
//! The endpoint defaults to the socket printed by the capture-server example
//! when only one is running under /tmp.

use std::thread;
use std::time::Duration;

use camlink::frame::{FrameConfig, FrameWriter};
use camlink::transport::{connect, Endpoint};

/// Uncompressed 24-bit BMP filled with one colour.
fn solid_bmp(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let row = (width * 3).div_ceil(4) * 4;
    let pixels = row * height;
    let file_size = 54 + pixels;

    let mut out = Vec::with_capacity(file_size as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&pixels.to_le_bytes());
    out.extend_from_slice(&[0; 16]);
    for _ in 0..height {
        for _ in 0..width {
            // BMP stores BGR.
            out.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
        }
        out.resize(out.len() + (row - width * 3) as usize, 0);
    }
    out
}

fn default_endpoint() -> Option<Endpoint> {
    std::fs::read_dir(std::env::temp_dir())
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().join("camera.sock"))
        .find(|path| path.exists())
        .map(Endpoint::Unix)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => default_endpoint().ok_or("no endpoint given and no camera.sock found")?,
    };

    let stream = connect(&endpoint)?;
    let mut writer = FrameWriter::with_config_stream(stream, FrameConfig::default())?;
    eprintln!("Connected to {endpoint}");

    let colours = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];
    for (i, rgb) in colours.iter().enumerate() {
        writer.send_keepalive()?;
        let frame = solid_bmp(32, 24, *rgb);
        writer.send_image(&frame)?;
        eprintln!("Sent frame {} ({} bytes)", i + 1, frame.len());
        thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}
