use camlink_decode::DecodedImage;
use crossbeam::channel::{bounded, select, Receiver, Sender};
use tracing::debug;

use crate::cancel::CancelSignal;

/// Receiving half of a [`ChannelSink`].
pub type ImageReceiver = Receiver<DecodedImage>;

/// Receives decoded images from a session.
///
/// `deliver` runs on the session's worker thread, once per successfully
/// decoded frame, in wire order. Implementations that need to hand images to
/// another thread should do so here (see [`ChannelSink`]).
pub trait FrameSink: Send + 'static {
    fn deliver(&mut self, image: DecodedImage);

    /// Called once before the worker starts. Sinks that can block in
    /// `deliver` should keep the signal and stop waiting once it fires.
    fn attach(&mut self, _cancel: CancelSignal) {}
}

impl<F> FrameSink for F
where
    F: FnMut(DecodedImage) + Send + 'static,
{
    fn deliver(&mut self, image: DecodedImage) {
        self(image)
    }
}

/// Forwards images through a bounded channel.
///
/// Sending blocks while the channel is full, which keeps ordering and pushes
/// back on the reader instead of buffering without bound. A blocked send is
/// abandoned, and the image dropped, when the session is cancelled.
pub struct ChannelSink {
    tx: Sender<DecodedImage>,
    cancel: Option<CancelSignal>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn bounded(capacity: usize) -> (Self, ImageReceiver) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, cancel: None }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn deliver(&mut self, image: DecodedImage) {
        let sent = match &self.cancel {
            Some(cancel) if cancel.is_cancelled() => {
                debug!("session cancelled; discarding frame");
                return;
            }
            Some(cancel) => select! {
                send(self.tx, image) -> res => res.is_ok(),
                recv(cancel.receiver()) -> _ => {
                    debug!("session cancelled while channel full; discarding frame");
                    return;
                }
            },
            None => self.tx.send(image).is_ok(),
        };
        if !sent {
            debug!("image receiver dropped; discarding frame");
        }
    }

    fn attach(&mut self, cancel: CancelSignal) {
        self.cancel = Some(cancel);
    }
}
