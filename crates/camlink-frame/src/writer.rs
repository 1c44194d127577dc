use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use camlink_transport::ByteStream;
use tracing::trace;

use crate::codec::{encode_header, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::receiver::transport_to_frame_error;

/// Writes image frames the way the camera firmware does.
///
/// The header goes out first, then the payload in `write_chunk_size`
/// slices, then a flush.
pub struct FrameWriter<T> {
    inner: T,
    header: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            header: BytesMut::with_capacity(HEADER_SIZE),
            config,
        }
    }

    /// Send one encoded image as a frame (blocking).
    ///
    /// A write that times out (`WouldBlock` or `TimedOut`) fails with
    /// [`FrameError::Io`]; the peer may then hold a partial frame.
    pub fn send_image(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.header.clear();
        encode_header(payload.len(), &mut self.header)?;
        write_fully(&mut self.inner, &self.header)?;

        let chunk_size = self.config.write_chunk_size.max(1);
        for chunk in payload.chunks(chunk_size) {
            write_fully(&mut self.inner, chunk)?;
        }
        trace!(size = payload.len(), chunk_size, "frame written");

        self.flush()
    }

    /// Send a zero-length header.
    pub fn send_keepalive(&mut self) -> Result<()> {
        write_fully(&mut self.inner, &[0u8; HEADER_SIZE])?;
        self.flush()
    }

    /// Flush the underlying stream. A write timeout surfaces as
    /// [`FrameError::Io`].
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<ByteStream> {
    /// Create a frame writer for a [`ByteStream`] and apply the configured write timeout.
    pub fn with_config_stream(inner: ByteStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn write_fully<T: Write>(inner: &mut T, data: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < data.len() {
        match inner.write(&data[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}
