use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use camlink_decode::{DecodedImage, DecoderConfig, RasterDecoder};
use camlink_frame::FrameConfig;
use camlink_session::{ImageReceiver, Session, SessionConfig, Termination};
use camlink_transport::CloseHandle;
use tracing::debug;

use crate::cmd::{parse_optional_duration, ReceiveArgs};
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_image, print_session_summary, OutputFormat};

/// Session settings from the shared receive flags.
pub fn session_config(args: &ReceiveArgs) -> CliResult<SessionConfig> {
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }
    Ok(SessionConfig {
        frame: FrameConfig {
            max_payload_size: args.max_payload,
            read_chunk_size: args.chunk_size,
            read_timeout: parse_optional_duration(args.read_timeout.as_deref())?,
            ..FrameConfig::default()
        },
        ..SessionConfig::default()
    })
}

/// The CLI only reports metadata and re-saves encoded bytes.
pub fn decoder() -> RasterDecoder {
    RasterDecoder::with_config(DecoderConfig {
        keep_pixels: false,
        ..DecoderConfig::default()
    })
}

/// Ctrl-C handling for receive commands.
///
/// While a session is being drained, Ctrl-C closes its stream so the worker
/// winds down and the summary still prints. With no session watched (e.g.
/// blocked in accept) the process exits straight away.
#[derive(Clone, Default)]
pub struct Interrupt {
    watched: Arc<Mutex<Option<CloseHandle>>>,
    stopped: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn install() -> CliResult<Self> {
        let interrupt = Self::default();
        let handler = interrupt.clone();
        ctrlc::set_handler(move || handler.trigger()).map_err(|err| {
            CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
        })?;
        Ok(interrupt)
    }

    fn trigger(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let slot = self.watched.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_ref() {
            Some(handle) => {
                debug!("interrupt: closing active session");
                handle.close();
            }
            None => std::process::exit(SUCCESS),
        }
    }

    fn watch(&self, handle: CloseHandle) {
        let mut slot = self.watched.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(handle);
    }

    fn clear(&self) {
        let mut slot = self.watched.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Prints and saves images across one or more sessions.
pub struct Capture {
    format: OutputFormat,
    save_dir: Option<PathBuf>,
    count: Option<usize>,
    received: usize,
}

impl Capture {
    pub fn new(args: &ReceiveArgs, format: OutputFormat) -> CliResult<Self> {
        Self::with_save_dir(args.save_dir.clone(), args.count, format)
    }

    pub fn with_save_dir(
        save_dir: Option<PathBuf>,
        count: Option<usize>,
        format: OutputFormat,
    ) -> CliResult<Self> {
        if let Some(dir) = &save_dir {
            fs::create_dir_all(dir)
                .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))?;
        }
        Ok(Self {
            format,
            save_dir,
            count,
            received: 0,
        })
    }

    /// True once `--count` images have been received.
    pub fn done(&self) -> bool {
        self.count.is_some_and(|count| self.received >= count)
    }

    /// Print (and save) images from `session` until it ends or the count is
    /// reached, then print the session summary.
    pub fn drain(
        &mut self,
        session: Session,
        images: ImageReceiver,
        interrupt: &Interrupt,
    ) -> CliResult<Termination> {
        interrupt.watch(session.close_handle());
        let id = session.id().to_string();

        for image in images.iter() {
            self.received += 1;
            let saved = self.save(&image, self.received)?;
            print_image(&image, &id, self.received, saved.as_deref(), self.format);
            if self.done() {
                session.cancel();
                break;
            }
        }
        interrupt.clear();

        let stats = session.stats();
        let termination = session.join();
        print_session_summary(&id, &stats, &termination, self.format);
        Ok(termination)
    }

    /// Write an image into the save directory, if one is configured.
    pub fn save(&self, image: &DecodedImage, index: usize) -> CliResult<Option<PathBuf>> {
        let Some(dir) = &self.save_dir else {
            return Ok(None);
        };
        let path = frame_path(dir, index, image.extension());
        fs::write(&path, image.encoded())
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        debug!(path = %path.display(), "saved image");
        Ok(Some(path))
    }
}

pub fn frame_path(dir: &Path, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("frame-{index:05}.{extension}"))
}
