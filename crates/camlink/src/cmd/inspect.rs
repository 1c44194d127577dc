use std::fs::File;
use std::io::BufReader;

use camlink_decode::{format_name, ImageDecoder};
use camlink_frame::{FrameConfig, FrameError, FrameReceiver};

use crate::cmd::receive::{decoder, Capture};
use crate::cmd::InspectArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{
    print_capture_summary, print_frame_report, print_raw, CaptureSummary, FrameReport,
    OutputFormat,
};

enum Outcome {
    Complete,
    Truncated { declared: usize, received: usize },
    OutOfSync { size: usize, max: usize },
}

impl Outcome {
    fn describe(&self) -> String {
        match self {
            Outcome::Complete => "complete".to_string(),
            Outcome::Truncated { declared, received } => {
                format!("truncated: last frame has {received} of {declared} bytes")
            }
            Outcome::OutOfSync { size, max } => {
                format!("out of sync: header declares {size} bytes, limit is {max}")
            }
        }
    }
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("failed opening {}", args.file.display()), err))?;
    let config = FrameConfig {
        max_payload_size: args.max_payload,
        ..FrameConfig::default()
    };
    let mut receiver = FrameReceiver::with_config(BufReader::new(file), config);
    let capture = Capture::with_save_dir(args.save_dir.clone(), None, format)?;
    let decoder = decoder();

    let mut frames = 0usize;
    let mut decoded = 0usize;
    let outcome = loop {
        let payload = match receiver.next_frame() {
            Ok(payload) => payload,
            Err(FrameError::ConnectionClosed) => break Outcome::Complete,
            Err(FrameError::Truncated { declared, received }) => {
                break Outcome::Truncated { declared, received }
            }
            Err(FrameError::PayloadTooLarge { size, max }) => {
                break Outcome::OutOfSync { size, max }
            }
            Err(err) => return Err(frame_error("read failed", err)),
        };

        frames += 1;
        let size = payload.len();
        let report = match decoder.decode(payload) {
            Ok(image) => {
                decoded += 1;
                capture.save(&image, frames)?;
                if matches!(format, OutputFormat::Raw) {
                    print_raw(image.encoded());
                }
                FrameReport {
                    kind: "frame",
                    index: frames,
                    size,
                    decoded: true,
                    format: Some(format_name(image.format())),
                    width: Some(image.width()),
                    height: Some(image.height()),
                    error: None,
                }
            }
            Err(err) => FrameReport {
                kind: "frame",
                index: frames,
                size,
                decoded: false,
                format: None,
                width: None,
                height: None,
                error: Some(err.to_string()),
            },
        };
        print_frame_report(&report, format);
    };

    let stats = receiver.stats();
    let failed = frames - decoded;
    print_capture_summary(
        &CaptureSummary {
            kind: "summary",
            file: args.file.display().to_string(),
            frames,
            decoded,
            failed,
            keepalives: stats.keepalives,
            bytes: stats.bytes,
            outcome: outcome.describe(),
        },
        format,
    );

    match outcome {
        Outcome::OutOfSync { .. } => Err(CliError::new(
            DATA_INVALID,
            format!("{}: {}", args.file.display(), outcome.describe()),
        )),
        Outcome::Truncated { .. } if args.strict => Err(CliError::new(
            DATA_INVALID,
            format!("{}: {}", args.file.display(), outcome.describe()),
        )),
        _ if args.strict && failed > 0 => Err(CliError::new(
            DATA_INVALID,
            format!("{}: {failed} frame(s) failed to decode", args.file.display()),
        )),
        _ => Ok(SUCCESS),
    }
}
