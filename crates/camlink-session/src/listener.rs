use std::sync::atomic::{AtomicU64, Ordering};

use camlink_decode::ImageDecoder;
use camlink_transport::{Endpoint, StreamListener};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;
use crate::sink::FrameSink;

/// Listens for cameras and starts a session per accepted connection.
pub struct SessionListener {
    listener: StreamListener,
    config: SessionConfig,
    next_session_id: AtomicU64,
}

impl SessionListener {
    /// Bind to an endpoint.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let listener = StreamListener::bind(endpoint)?;
        Ok(Self {
            listener,
            config: SessionConfig::default(),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Override session behavior for accepted connections.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next camera and assign an auto-generated session id.
    pub fn accept<D, S>(&self, decoder: D, sink: S) -> Result<Session>
    where
        D: ImageDecoder + 'static,
        S: FrameSink,
    {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.accept_with_id(&format!("camera-{id}"), decoder, sink)
    }

    /// Accept the next camera and use an explicit session id.
    pub fn accept_with_id<D, S>(&self, id: &str, decoder: D, sink: S) -> Result<Session>
    where
        D: ImageDecoder + 'static,
        S: FrameSink,
    {
        let stream = self.listener.accept()?;
        info!(session = id, transport = stream.kind(), "camera connected");
        Session::start_stream(stream, decoder, sink, self.config.named(id))
    }

    /// Bound endpoint. For TCP this carries the actual port.
    pub fn endpoint(&self) -> &Endpoint {
        self.listener.endpoint()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    use camlink_decode::DecodedImage;
    use crossbeam::channel::unbounded;

    use super::*;
    use crate::session::Termination;

    fn raw_decoder(payload: bytes::Bytes) -> camlink_decode::Result<DecodedImage> {
        Ok(DecodedImage::new(payload, None, 1, 1))
    }

    fn send_frames(endpoint: &Endpoint, payloads: &[&[u8]]) {
        let mut stream = camlink_transport::connect(endpoint).expect("camera should connect");
        for payload in payloads {
            stream
                .write_all(&(payload.len() as u32).to_le_bytes())
                .expect("header should write");
            stream.write_all(payload).expect("payload should write");
        }
    }

    #[cfg(unix)]
    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/camlink-session-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("camera.sock")
    }

    #[test]
    fn accepts_tcp_camera() {
        let listener = SessionListener::bind(&"tcp:127.0.0.1:0".parse().unwrap())
            .expect("listener should bind");
        let endpoint = listener.endpoint().clone();

        let camera = thread::spawn(move || send_frames(&endpoint, &[b"first", b"second"]));

        let (tx, rx) = unbounded();
        let session = listener
            .accept(raw_decoder, move |img: DecodedImage| {
                let _ = tx.send(img);
            })
            .expect("listener should accept");
        assert_eq!(session.id(), "camera-1");

        camera.join().expect("camera thread should finish");
        assert_eq!(session.join(), Termination::EndOfStream);

        let got: Vec<_> = rx.try_iter().map(|img| img.encoded().clone()).collect();
        assert_eq!(got, vec![&b"first"[..], &b"second"[..]]);
    }

    #[cfg(unix)]
    #[test]
    fn accepts_sequential_unix_cameras() {
        let sock_path = make_sock_path("multi");
        let endpoint = Endpoint::Unix(sock_path.clone());
        let listener = SessionListener::bind(&endpoint).expect("listener should bind");

        for expected in ["camera-1", "camera-2"] {
            let endpoint = endpoint.clone();
            let camera = thread::spawn(move || send_frames(&endpoint, &[b"frame"]));
            let (tx, rx) = unbounded();
            let session = listener
                .accept(raw_decoder, move |img: DecodedImage| {
                    let _ = tx.send(img);
                })
                .expect("listener should accept");
            assert_eq!(session.id(), expected);
            camera.join().expect("camera thread should finish");
            assert_eq!(session.join(), Termination::EndOfStream);
            assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
        }

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn connect_receives_from_listening_camera() {
        let camera = std::net::TcpListener::bind("127.0.0.1:0").expect("camera should bind");
        let endpoint = Endpoint::Tcp(camera.local_addr().unwrap().to_string());

        let server = thread::spawn(move || {
            let (mut stream, _) = camera.accept().expect("camera should accept");
            stream.write_all(&[3, 0, 0, 0, b'a', b'b', b'c']).unwrap();
        });

        let (tx, rx) = unbounded();
        let session = crate::connect(&endpoint, raw_decoder, move |img: DecodedImage| {
            let _ = tx.send(img);
        })
        .expect("session should connect");
        server.join().expect("camera thread should finish");

        assert_eq!(session.join(), Termination::EndOfStream);
        let img = rx.try_recv().expect("one frame should arrive");
        assert_eq!(img.encoded().as_ref(), b"abc");
    }
}
