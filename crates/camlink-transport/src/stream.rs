use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use tracing::debug;

use crate::close::CloseHandle;
use crate::error::Result;

/// A connected byte stream: implements Read + Write.
///
/// This is the stream the frame receiver reads from. On Unix it may wrap a
/// Unix domain socket; everywhere it may wrap a TCP socket. An RFCOMM link
/// bridged onto either of these looks exactly the same to the receiver.
pub struct ByteStream {
    inner: ByteStreamInner,
}

enum ByteStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.read(buf),
            ByteStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.write(buf),
            ByteStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.flush(),
            ByteStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl ByteStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ByteStreamInner::Unix(stream),
        }
    }

    /// Wrap a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: ByteStreamInner::Tcp(stream),
        }
    }

    /// A connected pair of in-process streams, handy for tests and demos.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            ByteStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            ByteStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            ByteStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Shut down both directions of the stream.
    ///
    /// A read blocked on another handle to the same socket returns
    /// end-of-data once this completes.
    pub fn shutdown(&self) -> std::io::Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
            ByteStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
        }
    }

    /// Create a handle that closes this stream from any thread.
    pub fn close_handle(&self) -> Result<CloseHandle> {
        let clone = self.try_clone()?;
        let kind = self.kind();
        Ok(CloseHandle::new(move || {
            debug!(transport = kind, "shutting down byte stream");
            clone.shutdown()
        }))
    }

    /// Short transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            ByteStreamInner::Unix(_) => "unix",
            ByteStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("type", &self.kind())
            .finish()
    }
}
