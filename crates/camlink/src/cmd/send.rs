use std::fs;
use std::path::PathBuf;

use camlink_decode::{sniff_format, ImageFormat};
use camlink_frame::{FrameConfig, FrameWriter};
use tracing::{debug, info};

use crate::cmd::{parse_optional_duration, SendArgs};
use crate::exit::{
    frame_error, io_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE,
};
use crate::output::{print_sent, OutputFormat};

struct Outgoing {
    path: PathBuf,
    payload: Vec<u8>,
    format: Option<ImageFormat>,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }
    let interval = parse_optional_duration(args.interval.as_deref())?;
    let outgoing = load_files(&args.files, args.allow_any)?;

    let stream = camlink_transport::connect(&args.endpoint)
        .map_err(|err| transport_error("connect failed", err))?;
    let config = FrameConfig {
        write_chunk_size: args.chunk_size,
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_stream(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    let total = outgoing.len() * args.repeat as usize;
    let mut sent = 0usize;
    for _ in 0..args.repeat {
        for item in &outgoing {
            if args.keepalive {
                writer
                    .send_keepalive()
                    .map_err(|err| frame_error("send failed", err))?;
            }
            writer
                .send_image(&item.payload)
                .map_err(|err| frame_error("send failed", err))?;
            sent += 1;
            print_sent(sent, &item.path, item.payload.len(), item.format, format);

            if let Some(pause) = interval.filter(|_| sent < total) {
                std::thread::sleep(pause);
            }
        }
    }

    info!(frames = sent, endpoint = %args.endpoint, "finished sending");
    Ok(SUCCESS)
}

fn load_files(paths: &[PathBuf], allow_any: bool) -> CliResult<Vec<Outgoing>> {
    paths
        .iter()
        .map(|path| {
            let payload = fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            if payload.is_empty() {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("{} is empty; empty frames read as keep-alives", path.display()),
                ));
            }
            let format = sniff_format(&payload);
            if format.is_none() && !allow_any {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!(
                        "{} does not look like an image (use --allow-any to send it anyway)",
                        path.display()
                    ),
                ));
            }
            debug!(path = %path.display(), size = payload.len(), "loaded frame");
            Ok(Outgoing {
                path: path.clone(),
                payload,
                format,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "camlink-send-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        fs::write(&path, contents).expect("temp file should be writable");
        path
    }

    #[test]
    fn rejects_non_images_unless_allowed() {
        let path = temp_file("text", b"just some text");
        let err = load_files(std::slice::from_ref(&path), false)
            .err()
            .expect("text should be rejected");
        assert_eq!(err.code, DATA_INVALID);

        let loaded = load_files(std::slice::from_ref(&path), true).expect("allow-any should load");
        assert_eq!(loaded[0].payload, b"just some text");
        assert!(loaded[0].format.is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_empty_files() {
        let path = temp_file("empty", b"");
        let err = load_files(std::slice::from_ref(&path), true)
            .err()
            .expect("empty file should be rejected");
        assert_eq!(err.code, DATA_INVALID);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn sniffs_image_files() {
        let path = temp_file("png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR");
        let loaded = load_files(std::slice::from_ref(&path), false).expect("png should load");
        assert_eq!(loaded[0].format, Some(ImageFormat::Png));
        let _ = fs::remove_file(path);
    }
}
