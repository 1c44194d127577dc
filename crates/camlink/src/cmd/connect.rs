use camlink_session::{connect_with_config, ChannelSink};

use crate::cmd::receive::{decoder, session_config, Capture, Interrupt};
use crate::cmd::ConnectArgs;
use crate::exit::{session_error, termination_result, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args.receive)?;
    let interrupt = Interrupt::install()?;
    let mut capture = Capture::new(&args.receive, format)?;

    let (sink, images) = ChannelSink::bounded(config.channel_capacity);
    let session = connect_with_config(&args.endpoint, decoder(), sink, config)
        .map_err(|err| session_error("connect failed", err))?;

    let termination = capture.drain(session, images, &interrupt)?;
    termination_result(&termination)?;
    Ok(SUCCESS)
}
