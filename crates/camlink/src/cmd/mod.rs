use std::path::PathBuf;
use std::time::Duration;

use camlink_frame::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_PAYLOAD};
use camlink_transport::Endpoint;
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod connect;
pub mod inspect;
pub mod listen;
pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept camera connections and print received images.
    Listen(ListenArgs),
    /// Dial a camera endpoint and print received images.
    Connect(ConnectArgs),
    /// Act as a camera: send image files as frames.
    Send(SendArgs),
    /// Decode every frame in a captured byte stream.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Connect(args) => connect::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that receives frames.
#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Write each received image into this directory.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
    /// Exit after receiving N images.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest frame accepted before the stream is treated as out of sync.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Bytes requested per payload read.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// End a session when the camera is silent this long (e.g. 10s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub read_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Endpoint to bind (unix:<path>, tcp:<host:port>, a path, or host:port).
    #[arg(value_parser = parse_endpoint)]
    pub endpoint: Endpoint,
    #[command(flatten)]
    pub receive: ReceiveArgs,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Camera endpoint to dial.
    #[arg(value_parser = parse_endpoint)]
    pub endpoint: Endpoint,
    #[command(flatten)]
    pub receive: ReceiveArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiver endpoint to dial.
    #[arg(value_parser = parse_endpoint)]
    pub endpoint: Endpoint,
    /// Image files to send, one frame each.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
    /// Send a keep-alive header before every frame.
    #[arg(long)]
    pub keepalive: bool,
    /// Pause between frames (e.g. 200ms, 1s).
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,
    /// Bytes per payload write.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Send the file list this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
    /// Send files even when they do not look like images.
    #[arg(long)]
    pub allow_any: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Captured byte stream (headers and payloads as sent on the wire).
    pub file: PathBuf,
    /// Write each decoded image into this directory.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
    /// Largest frame accepted before the stream is treated as out of sync.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Exit with a data error if any frame fails to decode or the stream is
    /// cut mid-frame.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_endpoint(input: &str) -> Result<Endpoint, String> {
    input.parse().map_err(|err| format!("{err}"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub fn parse_optional_duration(input: Option<&str>) -> CliResult<Option<Duration>> {
    input.map(parse_duration).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_endpoint_accepts_all_forms() {
        assert!(matches!(
            parse_endpoint("unix:/tmp/cam.sock").unwrap(),
            Endpoint::Unix(_)
        ));
        assert!(matches!(
            parse_endpoint("127.0.0.1:9000").unwrap(),
            Endpoint::Tcp(_)
        ));
        assert!(parse_endpoint("not an endpoint").is_err());
    }
}
