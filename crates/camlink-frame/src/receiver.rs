use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use camlink_transport::ByteStream;
use tracing::{debug, trace, warn};

use crate::codec::{FrameConfig, Header, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Where the receiver is in the frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Waiting for the next complete 4-byte header.
    AwaitingHeader,
    /// Collecting payload bytes for a frame of `size` bytes.
    AccumulatingPayload { size: usize, received: usize },
    /// Stream ended or failed; no further reads happen.
    Terminated,
}

/// Counters kept by a [`FrameReceiver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Complete payloads handed out.
    pub frames: u64,
    /// Headers that announced no frame (zero or negative length).
    pub keepalives: u64,
    /// Total bytes read from the stream.
    pub bytes: u64,
}

/// Reassembles length-prefixed image payloads from a blocking byte stream.
///
/// At most one frame is in flight. Payload reads never ask for more bytes
/// than the current frame still needs, so nothing belonging to the next
/// frame is consumed early. Any end-of-data or I/O error moves the receiver
/// to [`ReceiverState::Terminated`] and discards the partial frame.
pub struct FrameReceiver<T> {
    inner: T,
    state: ReceiverState,
    payload: BytesMut,
    chunk: Vec<u8>,
    config: FrameConfig,
    stats: ReceiverStats,
}

impl<T: Read> FrameReceiver<T> {
    /// Create a receiver with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a receiver with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            state: ReceiverState::AwaitingHeader,
            payload: BytesMut::new(),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            config,
            stats: ReceiverStats::default(),
        }
    }

    /// Block until the next complete payload has been received.
    ///
    /// Returns the raw payload bytes; the receiver is back in
    /// [`ReceiverState::AwaitingHeader`] afterwards. Once an error has been
    /// returned the receiver is terminated and every later call returns
    /// [`FrameError::Terminated`].
    pub fn next_frame(&mut self) -> Result<Bytes> {
        loop {
            match self.state {
                ReceiverState::Terminated => return Err(FrameError::Terminated),
                ReceiverState::AwaitingHeader => {
                    let raw = match self.read_header() {
                        Ok(raw) => raw,
                        Err(err) => return Err(self.terminate(err)),
                    };
                    match Header::parse(raw) {
                        Header::KeepAlive => {
                            self.stats.keepalives += 1;
                            trace!("keep-alive header");
                        }
                        Header::Negative(declared) => {
                            self.stats.keepalives += 1;
                            debug!(declared, "ignoring header with sign bit set");
                        }
                        Header::Payload(size) if size > self.config.max_payload_size => {
                            warn!(
                                size,
                                max = self.config.max_payload_size,
                                "declared frame size over limit; stream presumed out of sync"
                            );
                            return Err(self.terminate(FrameError::PayloadTooLarge {
                                size,
                                max: self.config.max_payload_size,
                            }));
                        }
                        Header::Payload(size) => {
                            debug!(size, "receiving frame");
                            self.payload.clear();
                            self.payload.reserve(size);
                            self.state = ReceiverState::AccumulatingPayload { size, received: 0 };
                        }
                    }
                }
                ReceiverState::AccumulatingPayload { size, received } => {
                    let want = (size - received).min(self.chunk.len());
                    let read = match self.inner.read(&mut self.chunk[..want]) {
                        Ok(0) => {
                            debug!(size, received, "stream ended mid-frame; discarding");
                            return Err(
                                self.terminate(FrameError::Truncated {
                                    declared: size,
                                    received,
                                }),
                            );
                        }
                        Ok(n) => n,
                        Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                        Err(err) => return Err(self.terminate(FrameError::Io(err))),
                    };

                    self.payload.extend_from_slice(&self.chunk[..read]);
                    self.stats.bytes += read as u64;
                    let received = received + read;

                    if received >= size {
                        self.state = ReceiverState::AwaitingHeader;
                        self.stats.frames += 1;
                        trace!(size, "frame complete");
                        return Ok(self.payload.split().freeze());
                    }
                    self.state = ReceiverState::AccumulatingPayload { size, received };
                }
            }
        }
    }

    fn read_header(&mut self) -> Result<[u8; HEADER_SIZE]> {
        let mut raw = [0u8; HEADER_SIZE];
        let mut filled = 0usize;
        while filled < HEADER_SIZE {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0) => {
                    if filled > 0 {
                        debug!(filled, "stream ended inside a header");
                    }
                    return Err(FrameError::ConnectionClosed);
                }
                Ok(n) => {
                    filled += n;
                    self.stats.bytes += n as u64;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(raw)
    }

    fn terminate(&mut self, err: FrameError) -> FrameError {
        self.state = ReceiverState::Terminated;
        self.payload.clear();
        err
    }

    /// Current state of the frame cycle.
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Whether the receiver has reached its terminal state.
    pub fn is_terminated(&self) -> bool {
        self.state == ReceiverState::Terminated
    }

    /// Counters since creation.
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the receiver and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReceiver<ByteStream> {
    /// Create a receiver for a [`ByteStream`] and apply the configured read timeout.
    pub fn with_config_stream(inner: ByteStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: camlink_transport::TransportError) -> FrameError {
    match err {
        camlink_transport::TransportError::Io(io)
        | camlink_transport::TransportError::Accept(io) => FrameError::Io(io),
        camlink_transport::TransportError::Bind { source, .. }
        | camlink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
