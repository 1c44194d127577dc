//! Async capture over TCP using the tokio codec.
//!
//! Run with:
//!   cargo run --example async-capture --features async
//!
//! Then point a camera (or `camlink send`) at 127.0.0.1:7070.

use camlink::decode::{ImageDecoder, RasterDecoder};
use camlink::frame::ImageFrameCodec;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:7070").await?;
    eprintln!("Listening on tcp:{}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        eprintln!("Camera connected from {peer}");

        tokio::spawn(async move {
            let decoder = RasterDecoder::new();
            let mut frames = FramedRead::new(stream, ImageFrameCodec::default());
            while let Some(frame) = frames.next().await {
                let payload = match frame {
                    Ok(payload) => payload,
                    Err(err) => {
                        eprintln!("{peer}: stream error: {err}");
                        break;
                    }
                };
                let decoded = tokio::task::spawn_blocking({
                    let decoder = decoder.clone();
                    move || decoder.decode(payload)
                })
                .await;
                match decoded {
                    Ok(Ok(image)) => eprintln!(
                        "{peer}: {}x{} {}",
                        image.width(),
                        image.height(),
                        image.info().format
                    ),
                    Ok(Err(err)) => eprintln!("{peer}: undecodable frame: {err}"),
                    Err(err) => eprintln!("{peer}: decode task failed: {err}"),
                }
            }
            eprintln!("{peer}: disconnected");
        });
    }
}
