use std::net::{TcpListener, TcpStream};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::ByteStream;
#[cfg(unix)]
use crate::uds::UnixSocketListener;

/// Accepts camera connections on any supported [`Endpoint`].
pub struct StreamListener {
    inner: ListenerInner,
    endpoint: Endpoint,
}

enum ListenerInner {
    #[cfg(unix)]
    Unix(UnixSocketListener),
    Tcp(TcpListener),
}

impl StreamListener {
    /// Bind and listen on `endpoint`.
    ///
    /// For TCP endpoints with port 0 the reported [`endpoint`](Self::endpoint)
    /// carries the port the OS picked.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Self {
                inner: ListenerInner::Unix(UnixSocketListener::bind(path)?),
                endpoint: endpoint.clone(),
            }),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
            Endpoint::Tcp(addr) => {
                let listener = TcpListener::bind(addr.as_str()).map_err(|source| {
                    TransportError::Bind {
                        endpoint: endpoint.to_string(),
                        source,
                    }
                })?;
                let local = listener.local_addr()?;
                info!(addr = %local, "listening on tcp");
                Ok(Self {
                    inner: ListenerInner::Tcp(listener),
                    endpoint: Endpoint::Tcp(local.to_string()),
                })
            }
        }
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<ByteStream> {
        match &self.inner {
            #[cfg(unix)]
            ListenerInner::Unix(listener) => listener.accept(),
            ListenerInner::Tcp(listener) => {
                let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%peer, "accepted tcp connection");
                Ok(ByteStream::from_tcp(stream))
            }
        }
    }

    /// The endpoint this listener is bound to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Connect to a listening endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<ByteStream> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => UnixSocketListener::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
        Endpoint::Tcp(addr) => {
            let stream =
                TcpStream::connect(addr.as_str()).map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            // Camera frames are written in small chunks; don't let Nagle batch them.
            stream.set_nodelay(true)?;
            debug!(%addr, "connected over tcp");
            Ok(ByteStream::from_tcp(stream))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn tcp_listener_reports_bound_port() {
        let listener = StreamListener::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let endpoint = listener.endpoint().clone();
        assert!(matches!(&endpoint, Endpoint::Tcp(addr) if !addr.ends_with(":0")));

        let client = std::thread::spawn(move || {
            let mut stream = connect(&endpoint).unwrap();
            stream.write_all(b"hi").unwrap();
        });

        let mut accepted = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        accepted.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi");
        client.join().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn unix_listener_accepts() {
        let dir = std::env::temp_dir().join(format!("camlink-listener-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let endpoint = Endpoint::Unix(dir.join("cam.sock"));

        let listener = StreamListener::bind(&endpoint).unwrap();
        let target = endpoint.clone();
        let client = std::thread::spawn(move || {
            let mut stream = connect(&target).unwrap();
            stream.write_all(b"yo").unwrap();
        });

        let mut accepted = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        accepted.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"yo");
        assert_eq!(listener.endpoint(), &endpoint);

        client.join().unwrap();
        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_refused_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(&Endpoint::Tcp(addr.to_string())).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
