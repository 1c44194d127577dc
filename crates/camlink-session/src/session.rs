use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use camlink_decode::ImageDecoder;
use camlink_frame::{FrameError, FrameReceiver};
use camlink_transport::{ByteStream, CloseHandle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::{CancelSignal, CancelTrigger};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::sink::{ChannelSink, FrameSink, ImageReceiver};
use crate::stats::{SessionStats, SharedStats};

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// The peer closed the stream between frames.
    EndOfStream,
    /// The peer closed the stream mid-frame; the partial frame was discarded.
    Truncated { declared: usize, received: usize },
    /// [`Session::cancel`] was called (or the session was dropped).
    Cancelled,
    /// A read failed.
    Io { message: String },
    /// A header announced a frame above the configured limit.
    PayloadTooLarge { size: usize, max: usize },
    /// The sink or decoder panicked on the worker thread.
    WorkerPanicked,
}

impl Termination {
    /// True for terminations caused by the peer or by cancellation rather
    /// than a fault.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            Self::EndOfStream | Self::Truncated { .. } | Self::Cancelled
        )
    }

    fn from_frame_error(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed | FrameError::Terminated => Self::EndOfStream,
            FrameError::Truncated { declared, received } => Self::Truncated { declared, received },
            FrameError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            other => Self::Io {
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfStream => write!(f, "peer closed the stream"),
            Self::Truncated { declared, received } => write!(
                f,
                "peer closed the stream mid-frame ({received} of {declared} bytes)"
            ),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Io { message } => write!(f, "read failed: {message}"),
            Self::PayloadTooLarge { size, max } => {
                write!(f, "declared frame of {size} bytes exceeds limit of {max}")
            }
            Self::WorkerPanicked => write!(f, "receive worker panicked"),
        }
    }
}

/// A running receive session.
///
/// The session owns one worker thread that reads frames, decodes each one and
/// hands successful images to the sink. Frames are delivered in wire order,
/// at most once. Dropping the session cancels it without waiting for the
/// worker; use [`Session::join`] to wait.
pub struct Session {
    id: String,
    closer: CloseHandle,
    trigger: CancelTrigger,
    cancel: CancelSignal,
    active: Arc<AtomicBool>,
    stats: Arc<SharedStats>,
    worker: Option<JoinHandle<Termination>>,
}

impl Session {
    /// Start a session over any blocking reader.
    ///
    /// `closer` must unblock a pending read on `reader` when closed;
    /// [`CloseHandle::noop`] is fine for readers that end on their own.
    pub fn start<R, D, S>(
        reader: R,
        closer: CloseHandle,
        decoder: D,
        sink: S,
        config: SessionConfig,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        D: ImageDecoder + 'static,
        S: FrameSink,
    {
        let receiver = FrameReceiver::with_config(reader, config.frame.clone());
        Self::spawn(receiver, closer, decoder, sink, config)
    }

    /// Start a session over a connected stream.
    ///
    /// The configured read timeout is applied to the stream and cancellation
    /// shuts it down.
    pub fn start_stream<D, S>(
        stream: ByteStream,
        decoder: D,
        sink: S,
        config: SessionConfig,
    ) -> Result<Self>
    where
        D: ImageDecoder + 'static,
        S: FrameSink,
    {
        let closer = stream.close_handle()?;
        let receiver = FrameReceiver::with_config_stream(stream, config.frame.clone())?;
        Self::spawn(receiver, closer, decoder, sink, config)
    }

    /// Start a session that forwards images through a bounded channel of
    /// `config.channel_capacity`.
    ///
    /// Cancelling releases a worker blocked on a full channel, so `join`
    /// returns even if nobody drains the receiver.
    pub fn start_channel<D>(
        stream: ByteStream,
        decoder: D,
        config: SessionConfig,
    ) -> Result<(Self, ImageReceiver)>
    where
        D: ImageDecoder + 'static,
    {
        let (sink, rx) = ChannelSink::bounded(config.channel_capacity);
        let session = Self::start_stream(stream, decoder, sink, config)?;
        Ok((session, rx))
    }

    fn spawn<R, D, S>(
        receiver: FrameReceiver<R>,
        closer: CloseHandle,
        decoder: D,
        mut sink: S,
        config: SessionConfig,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        D: ImageDecoder + 'static,
        S: FrameSink,
    {
        let (trigger, cancel) = CancelTrigger::new();
        sink.attach(cancel.clone());
        let active = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(SharedStats::default());

        let worker = Worker {
            id: config.name.clone(),
            receiver,
            decoder,
            sink,
            cancel: cancel.clone(),
            stats: Arc::clone(&stats),
        };
        let guard = ActiveGuard(Arc::clone(&active));

        let handle = std::thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || {
                let _guard = guard;
                worker.run()
            })
            .map_err(SessionError::Spawn)?;

        info!(session = %config.name, "receive session started");
        Ok(Self {
            id: config.name,
            closer,
            trigger,
            cancel,
            active,
            stats,
            worker: Some(handle),
        })
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stop the session.
    ///
    /// Fires the cancel signal and closes the stream, so a worker blocked in
    /// a read or in a [`ChannelSink`] send returns. Safe to call any number of
    /// times, from any thread.
    ///
    /// Best effort for sinks that never block: an image already past the
    /// final check when this lands is still delivered.
    pub fn cancel(&self) {
        if self.trigger.fire() {
            debug!(session = %self.id, "cancelling receive session");
        }
        self.closer.close();
    }

    /// Handle that cancels the stream from elsewhere (e.g. a signal handler).
    pub fn close_handle(&self) -> CloseHandle {
        self.closer.clone()
    }

    /// True while the worker thread is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// True once [`Session::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current counters.
    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    /// Wait for the worker to finish and report why it stopped.
    pub fn join(mut self) -> Termination {
        match self.worker.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!(session = %self.id, "receive worker panicked");
                Termination::WorkerPanicked
            }),
            None => Termination::Cancelled,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Worker<R, D, S> {
    id: String,
    receiver: FrameReceiver<R>,
    decoder: D,
    sink: S,
    cancel: CancelSignal,
    stats: Arc<SharedStats>,
}

impl<R: Read, D: ImageDecoder, S: FrameSink> Worker<R, D, S> {
    fn run(mut self) -> Termination {
        let termination = self.receive_loop();
        let stats = self.stats.snapshot();
        if termination.is_clean() {
            info!(
                session = %self.id,
                %termination,
                frames = stats.frames_received,
                delivered = stats.images_delivered,
                "receive session ended"
            );
        } else {
            warn!(
                session = %self.id,
                %termination,
                frames = stats.frames_received,
                delivered = stats.images_delivered,
                "receive session failed"
            );
        }
        termination
    }

    fn receive_loop(&mut self) -> Termination {
        while !self.cancel.is_cancelled() {
            let result = self.receiver.next_frame();
            self.stats.sync_receiver(&self.receiver.stats());

            let payload = match result {
                Ok(payload) => payload,
                Err(_) if self.cancel.is_cancelled() => return Termination::Cancelled,
                Err(err) => return Termination::from_frame_error(err),
            };

            let size = payload.len();
            match self.decoder.decode(payload) {
                Ok(image) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    self.stats.record_delivered();
                    self.sink.deliver(image);
                }
                Err(err) => {
                    self.stats.record_decode_failure();
                    warn!(session = %self.id, size, error = %err, "frame did not decode; waiting for next");
                }
            }
        }
        Termination::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::Bytes;
    use camlink_decode::{DecodeError, DecodedImage, RasterDecoder};
    use camlink_frame::FrameConfig;

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn stub_decoder(payload: Bytes) -> camlink_decode::Result<DecodedImage> {
        if payload.starts_with(b"bad") {
            return Err(DecodeError::UnknownFormat {
                len: payload.len(),
                prefix: String::new(),
            });
        }
        Ok(DecodedImage::new(payload, None, 1, 1))
    }

    fn collector() -> (Arc<Mutex<Vec<DecodedImage>>>, impl FrameSink) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        (seen, move |img: DecodedImage| sink_seen.lock().unwrap().push(img))
    }

    fn run_to_end(wire: Vec<u8>) -> (Vec<DecodedImage>, Termination, SessionStats) {
        let (seen, sink) = collector();
        let session = Session::start(
            Cursor::new(wire),
            CloseHandle::noop(),
            stub_decoder,
            sink,
            SessionConfig::default(),
        )
        .unwrap();
        while session.is_active() {
            std::thread::sleep(Duration::from_millis(1));
        }
        let stats = session.stats();
        let termination = session.join();
        let images = std::mem::take(&mut *seen.lock().unwrap());
        (images, termination, stats)
    }

    #[test]
    fn delivers_single_frame_then_ends() {
        let mut wire = vec![0x0A, 0x00, 0x00, 0x00];
        wire.extend_from_slice(&[7u8; 10]);

        let (images, termination, stats) = run_to_end(wire);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].encoded().as_ref(), &[7u8; 10]);
        assert_eq!((images[0].width(), images[0].height()), (1, 1));
        assert_eq!(termination, Termination::EndOfStream);
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.images_delivered, 1);
        assert_eq!(stats.bytes_received, 14);
    }

    #[test]
    fn delivers_frames_in_wire_order() {
        let mut wire = Vec::new();
        for i in 0..20u8 {
            wire.extend(frame(&[i; 33]));
        }
        let (images, termination, _) = run_to_end(wire);
        let firsts: Vec<u8> = images.iter().map(|img| img.encoded()[0]).collect();
        assert_eq!(firsts, (0..20u8).collect::<Vec<_>>());
        assert_eq!(termination, Termination::EndOfStream);
    }

    #[test]
    fn decode_failure_does_not_end_session() {
        let mut wire = frame(b"bad-bytes");
        wire.extend(frame(b"good"));

        let (images, termination, stats) = run_to_end(wire);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].encoded().as_ref(), b"good");
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(stats.frames_received, 2);
        assert_eq!(termination, Termination::EndOfStream);
    }

    #[test]
    fn keepalive_headers_produce_no_callbacks() {
        let mut wire = vec![0, 0, 0, 0];
        wire.extend_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        wire.extend(frame(b"after"));

        let (images, _, stats) = run_to_end(wire);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].encoded().as_ref(), b"after");
        assert_eq!(stats.keepalives, 2);
    }

    #[test]
    fn truncated_frame_is_discarded() {
        let mut wire = 100u32.to_le_bytes().to_vec();
        wire.extend_from_slice(&[1u8; 40]);

        let (images, termination, _) = run_to_end(wire);
        assert!(images.is_empty());
        assert_eq!(
            termination,
            Termination::Truncated {
                declared: 100,
                received: 40
            }
        );
        assert!(termination.is_clean());
    }

    #[test]
    fn oversized_header_ends_session() {
        let wire = (64u32 * 1024 * 1024).to_le_bytes().to_vec();
        let (images, termination, _) = run_to_end(wire);
        assert!(images.is_empty());
        assert!(matches!(termination, Termination::PayloadTooLarge { .. }));
        assert!(!termination.is_clean());
    }

    #[test]
    fn decodes_real_png_frames() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            4,
            3,
            image::Rgb([1, 2, 3]),
        ));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let (seen, sink) = collector();
        let session = Session::start(
            Cursor::new(frame(png.get_ref())),
            CloseHandle::noop(),
            RasterDecoder::new(),
            sink,
            SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(session.join(), Termination::EndOfStream);

        let images = seen.lock().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].width(), images[0].height()), (4, 3));
        assert!(images[0].pixels().is_some());
    }

    #[test]
    fn panicking_sink_is_reported() {
        let session = Session::start(
            Cursor::new(frame(b"boom")),
            CloseHandle::noop(),
            stub_decoder,
            |_: DecodedImage| panic!("sink failure"),
            SessionConfig::default().named("panicky"),
        )
        .unwrap();
        assert_eq!(session.id(), "panicky");
        assert_eq!(session.join(), Termination::WorkerPanicked);
    }

    #[test]
    fn termination_serializes_with_reason_tag() {
        let json = serde_json::to_value(Termination::PayloadTooLarge { size: 9, max: 4 }).unwrap();
        assert_eq!(json["reason"], "payload_too_large");
        assert_eq!(json["size"], 9);
    }

    #[cfg(unix)]
    #[test]
    fn cancel_unblocks_silent_stream() {
        let (phone, _camera) = ByteStream::pair().unwrap();
        let (seen, sink) = collector();
        let session =
            Session::start_stream(phone, stub_decoder, sink, SessionConfig::default()).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert!(session.is_active());

        session.cancel();
        session.cancel();
        assert!(session.is_cancelled());
        assert_eq!(session.join(), Termination::Cancelled);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn cancel_after_frames_stops_delivery() {
        let (phone, mut camera) = ByteStream::pair().unwrap();
        let (session, rx) =
            Session::start_channel(phone, stub_decoder, SessionConfig::default()).unwrap();

        camera.write_all(&frame(b"one")).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.encoded().as_ref(), b"one");

        session.cancel();
        assert_eq!(session.join(), Termination::Cancelled);

        let _ = camera.write_all(&frame(b"two"));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn cancel_releases_worker_blocked_on_full_channel() {
        let (phone, mut camera) = ByteStream::pair().expect("socket pair should open");
        let config = SessionConfig {
            channel_capacity: 1,
            ..SessionConfig::default()
        };
        let (session, rx) = Session::start_channel(phone, stub_decoder, config)
            .expect("channel session should start");

        for tag in [b"1", b"2", b"3", b"4"] {
            camera.write_all(&frame(tag)).expect("frame write should succeed");
        }
        std::thread::sleep(Duration::from_millis(200));
        session.cancel();

        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        std::thread::spawn(move || {
            let _ = done_tx.send(session.join());
        });
        let termination = done_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("join should return after cancel with a full channel");
        assert_eq!(termination, Termination::Cancelled);

        let first = rx.try_recv().expect("first frame should be queued");
        assert_eq!(first.encoded().as_ref(), b"1");
        assert!(rx.try_recv().is_err(), "no frame should arrive after cancel");
    }

    #[cfg(unix)]
    #[test]
    fn peer_close_ends_stream_session() {
        let (phone, mut camera) = ByteStream::pair().unwrap();
        let (session, rx) =
            Session::start_channel(phone, stub_decoder, SessionConfig::default()).unwrap();

        camera.write_all(&frame(b"only")).unwrap();
        drop(camera);

        assert_eq!(session.join(), Termination::EndOfStream);
        let got: Vec<DecodedImage> = rx.try_iter().collect();
        assert_eq!(got.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn dropping_session_closes_stream() {
        let (phone, mut camera) = ByteStream::pair().unwrap();
        let (_seen, sink) = collector();
        let session =
            Session::start_stream(phone, stub_decoder, sink, SessionConfig::default()).unwrap();
        drop(session);

        camera
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(std::io::Read::read(&mut camera, &mut buf).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn read_timeout_surfaces_as_io_termination() {
        let (phone, _camera) = ByteStream::pair().unwrap();
        let config = SessionConfig {
            frame: FrameConfig {
                read_timeout: Some(Duration::from_millis(20)),
                ..FrameConfig::default()
            },
            ..SessionConfig::default()
        };
        let (_seen, sink) = collector();
        let session = Session::start_stream(phone, stub_decoder, sink, config).unwrap();
        assert!(matches!(session.join(), Termination::Io { .. }));
    }
}
