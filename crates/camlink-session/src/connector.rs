use camlink_decode::ImageDecoder;
use camlink_transport::Endpoint;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;
use crate::sink::FrameSink;

/// Connect to a camera (or a bridge forwarding one) and start receiving.
pub fn connect<D, S>(endpoint: &Endpoint, decoder: D, sink: S) -> Result<Session>
where
    D: ImageDecoder + 'static,
    S: FrameSink,
{
    connect_with_config(endpoint, decoder, sink, SessionConfig::default())
}

/// Connect with explicit session configuration.
pub fn connect_with_config<D, S>(
    endpoint: &Endpoint,
    decoder: D,
    sink: S,
    config: SessionConfig,
) -> Result<Session>
where
    D: ImageDecoder + 'static,
    S: FrameSink,
{
    let stream = camlink_transport::connect(endpoint)?;
    debug!(%endpoint, transport = stream.kind(), "connected to camera");
    Session::start_stream(stream, decoder, sink, config)
}
