use camlink_session::{ChannelSink, SessionListener};
use tracing::{info, warn};

use crate::cmd::receive::{decoder, session_config, Capture, Interrupt};
use crate::cmd::ListenArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args.receive)?;
    let capacity = config.channel_capacity;
    let listener = SessionListener::bind(&args.endpoint)
        .map_err(|err| session_error("bind failed", err))?
        .with_config(config);
    info!(endpoint = %listener.endpoint(), "listening for cameras");

    let interrupt = Interrupt::install()?;
    let mut capture = Capture::new(&args.receive, format)?;
    let decoder = decoder();

    while !capture.done() && !interrupt.stopped() {
        let (sink, images) = ChannelSink::bounded(capacity);
        let session = listener
            .accept(decoder.clone(), sink)
            .map_err(|err| session_error("accept failed", err))?;

        let termination = capture.drain(session, images, &interrupt)?;
        if !termination.is_clean() {
            warn!(%termination, "camera session failed; waiting for the next camera");
        }
    }

    Ok(SUCCESS)
}
