use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Address of a byte-stream endpoint.
///
/// Parsed from `unix:<path>`, `tcp:<host:port>`, a bare filesystem path or a
/// bare `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket at a filesystem path.
    Unix(PathBuf),
    /// TCP socket address (`host:port`).
    Tcp(String),
}

impl Endpoint {
    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix-domain-socket",
            Endpoint::Tcp(_) => "tcp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if let Some(path) = input.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = input.strip_prefix("tcp:") {
            return parse_tcp(addr)
                .map(Endpoint::Tcp)
                .ok_or_else(|| TransportError::InvalidEndpoint(input.to_string()));
        }
        if input.contains('/') || input.ends_with(".sock") {
            return Ok(Endpoint::Unix(PathBuf::from(input)));
        }
        parse_tcp(input)
            .map(Endpoint::Tcp)
            .ok_or_else(|| TransportError::InvalidEndpoint(input.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

fn parse_tcp(addr: &str) -> Option<String> {
    let (host, port) = addr.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    Some(addr.to_string())
}
