//! Minimal capture server: accepts one camera and prints every image.
//!
//! Run with:
//!   cargo run --example capture-server
//!
//! In another terminal, play the camera:
//!   cargo run --example fake-camera
//! or send real files:
//!   cargo run --features cli -- send /tmp/camlink-capture-<pid>/camera.sock a.jpg b.jpg

use std::fs;

use camlink::decode::{DecodedImage, RasterDecoder};
use camlink::session::SessionListener;
use camlink::transport::Endpoint;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("camlink-capture-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let endpoint = Endpoint::Unix(sock_dir.join("camera.sock"));

    let listener = SessionListener::bind(&endpoint)?;
    eprintln!("Listening on {}", listener.endpoint());

    let session = listener.accept(RasterDecoder::new(), |image: DecodedImage| {
        let info = image.info();
        eprintln!(
            "Received {} image {}x{} ({} bytes)",
            info.format, info.width, info.height, info.encoded_len
        );
    })?;
    eprintln!("Camera connected: {}", session.id());

    let termination = session.join();
    eprintln!("Session ended: {termination}");

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
