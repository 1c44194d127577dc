use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use camlink_decode::{format_name, DecodedImage};
use camlink_session::{SessionStats, Termination};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ImageOutput<'a> {
    kind: &'static str,
    session: &'a str,
    index: usize,
    format: &'static str,
    width: u32,
    height: u32,
    size: usize,
    saved: Option<String>,
    timestamp: String,
}

/// One received image.
pub fn print_image(
    image: &DecodedImage,
    session: &str,
    index: usize,
    saved: Option<&Path>,
    format: OutputFormat,
) {
    let saved = saved.map(|path| path.display().to_string());
    match format {
        OutputFormat::Json => print_json(&ImageOutput {
            kind: "image",
            session,
            index,
            format: format_name(image.format()),
            width: image.width(),
            height: image.height(),
            size: image.encoded().len(),
            saved,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            vec!["#", "SESSION", "FORMAT", "SIZE", "DIMENSIONS", "SAVED"],
            vec![
                index.to_string(),
                session.to_string(),
                format_name(image.format()).to_string(),
                image.encoded().len().to_string(),
                dimensions(image.width(), image.height()),
                saved.unwrap_or_else(|| "-".to_string()),
            ],
        ),
        OutputFormat::Pretty => {
            print!(
                "image #{index} session={session} format={} size={} {}",
                format_name(image.format()),
                image.encoded().len(),
                dimensions(image.width(), image.height()),
            );
            match saved {
                Some(path) => println!(" saved={path}"),
                None => println!(),
            }
        }
        OutputFormat::Raw => print_raw(image.encoded()),
    }
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    kind: &'static str,
    session: &'a str,
    termination: &'a Termination,
    #[serde(flatten)]
    stats: &'a SessionStats,
}

/// End-of-session summary. Not printed in raw mode.
pub fn print_session_summary(
    session: &str,
    stats: &SessionStats,
    termination: &Termination,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&SessionOutput {
            kind: "session",
            session,
            termination,
            stats,
        }),
        OutputFormat::Table => print_table(
            vec!["SESSION", "ENDED", "FRAMES", "IMAGES", "FAILED", "KEEPALIVES", "BYTES"],
            vec![
                session.to_string(),
                termination.to_string(),
                stats.frames_received.to_string(),
                stats.images_delivered.to_string(),
                stats.decode_failures.to_string(),
                stats.keepalives.to_string(),
                stats.bytes_received.to_string(),
            ],
        ),
        OutputFormat::Pretty => println!(
            "session {session} ended: {termination} (frames={} images={} failed={} keepalives={} bytes={})",
            stats.frames_received,
            stats.images_delivered,
            stats.decode_failures,
            stats.keepalives,
            stats.bytes_received,
        ),
        OutputFormat::Raw => {}
    }
}

/// Result of decoding one frame from a capture file.
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub kind: &'static str,
    pub index: usize,
    pub size: usize,
    pub decoded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn print_frame_report(report: &FrameReport, format: OutputFormat) {
    let detail = match (&report.error, report.width, report.height) {
        (Some(err), _, _) => err.clone(),
        (None, Some(w), Some(h)) => dimensions(w, h),
        _ => "-".to_string(),
    };
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => print_table(
            vec!["#", "SIZE", "FORMAT", "STATUS", "DETAIL"],
            vec![
                report.index.to_string(),
                report.size.to_string(),
                report.format.unwrap_or("-").to_string(),
                status(report.decoded).to_string(),
                detail,
            ],
        ),
        OutputFormat::Pretty => println!(
            "frame #{} size={} format={} {}: {detail}",
            report.index,
            report.size,
            report.format.unwrap_or("-"),
            status(report.decoded),
        ),
        OutputFormat::Raw => {}
    }
}

/// Totals for an offline capture inspection.
#[derive(Debug, Serialize)]
pub struct CaptureSummary {
    pub kind: &'static str,
    pub file: String,
    pub frames: usize,
    pub decoded: usize,
    pub failed: usize,
    pub keepalives: u64,
    pub bytes: u64,
    pub outcome: String,
}

pub fn print_capture_summary(summary: &CaptureSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => print_table(
            vec!["FILE", "FRAMES", "DECODED", "FAILED", "KEEPALIVES", "BYTES", "OUTCOME"],
            vec![
                summary.file.clone(),
                summary.frames.to_string(),
                summary.decoded.to_string(),
                summary.failed.to_string(),
                summary.keepalives.to_string(),
                summary.bytes.to_string(),
                summary.outcome.clone(),
            ],
        ),
        OutputFormat::Pretty => println!(
            "{}: frames={} decoded={} failed={} keepalives={} bytes={} ({})",
            summary.file,
            summary.frames,
            summary.decoded,
            summary.failed,
            summary.keepalives,
            summary.bytes,
            summary.outcome,
        ),
        OutputFormat::Raw => {}
    }
}

#[derive(Serialize)]
struct SentOutput<'a> {
    kind: &'static str,
    index: usize,
    file: &'a str,
    size: usize,
    format: &'static str,
}

/// One image written by `send`. Not printed in raw mode.
pub fn print_sent(
    index: usize,
    file: &Path,
    size: usize,
    image_format: Option<camlink_decode::ImageFormat>,
    format: OutputFormat,
) {
    let file = file.display().to_string();
    let image_format = format_name(image_format);
    match format {
        OutputFormat::Json => print_json(&SentOutput {
            kind: "sent",
            index,
            file: &file,
            size,
            format: image_format,
        }),
        OutputFormat::Table => print_table(
            vec!["#", "FILE", "FORMAT", "SIZE"],
            vec![index.to_string(), file, image_format.to_string(), size.to_string()],
        ),
        OutputFormat::Pretty => {
            println!("sent #{index} {file} format={image_format} size={size}")
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

fn dimensions(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

fn status(decoded: bool) -> &'static str {
    if decoded {
        "decoded"
    } else {
        "failed"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_report_omits_empty_fields() {
        let report = FrameReport {
            kind: "frame",
            index: 1,
            size: 10,
            decoded: false,
            format: None,
            width: None,
            height: None,
            error: Some("unrecognized".into()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["decoded"], false);
        assert!(json.get("width").is_none());
        assert_eq!(json["error"], "unrecognized");
    }

    #[test]
    fn session_summary_flattens_stats() {
        let stats = SessionStats {
            frames_received: 2,
            images_delivered: 1,
            decode_failures: 1,
            keepalives: 0,
            bytes_received: 64,
        };
        let out = SessionOutput {
            kind: "session",
            session: "camera-1",
            termination: &Termination::EndOfStream,
            stats: &stats,
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["frames_received"], 2);
        assert_eq!(json["termination"]["reason"], "end_of_stream");
    }
}
