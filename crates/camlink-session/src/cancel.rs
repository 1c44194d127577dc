use std::sync::{Mutex, PoisonError};

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};

/// Cancellation state of a session, shared with its worker and sink.
///
/// Nothing is ever sent on the inner channel; cancelling drops the only
/// sender, so [`CancelSignal::receiver`] turns ready (disconnected) and can
/// sit in a `select!` next to a blocking send.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelSignal {
    /// True once the owning session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready when the session is cancelled.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[derive(Debug)]
pub(crate) struct CancelTrigger {
    tx: Mutex<Option<Sender<()>>>,
}

impl CancelTrigger {
    pub(crate) fn new() -> (Self, CancelSignal) {
        let (tx, rx) = bounded(0);
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            CancelSignal { rx },
        )
    }

    /// Returns true on the first call only.
    pub(crate) fn fire(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam::channel::select;

    use super::*;

    #[test]
    fn fire_is_observed_by_every_clone() {
        let (trigger, signal) = CancelTrigger::new();
        let other = signal.clone();
        assert!(!signal.is_cancelled());

        assert!(trigger.fire());
        assert!(!trigger.fire(), "second fire should report already cancelled");
        assert!(signal.is_cancelled());
        assert!(other.is_cancelled());
    }

    #[test]
    fn fire_wakes_a_blocked_select() {
        let (trigger, signal) = CancelTrigger::new();
        let (_tx, never) = bounded::<u8>(0);

        let waiter = std::thread::spawn(move || {
            select! {
                recv(never) -> _ => false,
                recv(signal.receiver()) -> _ => true,
            }
        });
        std::thread::sleep(Duration::from_millis(20));
        trigger.fire();
        assert!(waiter.join().expect("waiter should not panic"));
    }
}
