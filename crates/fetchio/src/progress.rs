//! # Progress Streams
//!
//! Per-request progress reporting: a single-slot, drop-oldest stream of
//! fractional completion values ending in a terminal sentinel. A slow
//! consumer only ever sees the most recent value and never blocks the
//! producer.

use tokio::sync::watch;

/// One observed progress value for a download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction of the content downloaded so far.
    ///
    /// Normally in `[0, 1]`, but when the server does not report a content
    /// length the values are meaningless; consumers should rely on the
    /// terminal variants for completion.
    Fraction(f32),
    /// The download finished and the file is fully written.
    Done,
    /// The download failed or was cancelled; no file was left behind.
    Failed,
}

impl Progress {
    /// Whether this value ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Progress::Done | Progress::Failed)
    }

    /// The fractional value, if this is not a terminal sentinel.
    pub fn fraction(&self) -> Option<f32> {
        match self {
            Progress::Fraction(f) => Some(*f),
            _ => None,
        }
    }
}

/// Producer half of a progress stream.
///
/// Sending overwrites the previous value unconditionally, which is what
/// gives the stream its capacity-1, drop-oldest behavior.
#[derive(Debug)]
pub(crate) struct ProgressSender {
    tx: watch::Sender<Progress>,
}

impl ProgressSender {
    pub(crate) fn send(&self, value: Progress) {
        self.tx.send_replace(value);
    }
}

/// Consumer half of a progress stream.
///
/// Cloning yields another view of the same underlying stream; all clones
/// observe the same sequence of (possibly skipped) values. Delivered
/// fractions are monotonically non-decreasing up to the terminal value.
#[derive(Debug, Clone)]
pub struct ProgressStream {
    rx: watch::Receiver<Progress>,
}

impl ProgressStream {
    /// The most recent value, without waiting.
    pub fn current(&self) -> Progress {
        *self.rx.borrow()
    }

    /// Whether the stream has already reached a terminal value.
    pub fn is_terminal(&self) -> bool {
        self.current().is_terminal()
    }

    /// Wait for the next value.
    ///
    /// Returns `None` once no further values can arrive (the producer is
    /// gone); `current()` then holds the final value.
    pub async fn changed(&mut self) -> Option<Progress> {
        if self.rx.changed().await.is_ok() {
            Some(*self.rx.borrow())
        } else {
            None
        }
    }

    /// Wait until the stream reaches a terminal value and return it.
    ///
    /// If the producer disappears without sending one, the last observed
    /// value is returned instead.
    pub async fn wait_terminal(&mut self) -> Progress {
        loop {
            let current = *self.rx.borrow();
            if current.is_terminal() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }
}

/// Create a fresh progress stream starting at fraction zero.
pub(crate) fn channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = watch::channel(Progress::Fraction(0.0));
    (ProgressSender { tx }, ProgressStream { rx })
}

/// A stream that is already terminated with `Done`.
///
/// Used for cache hits and local resources, where there is nothing to
/// report: the file is usable immediately.
pub(crate) fn completed() -> ProgressStream {
    let (tx, rx) = watch::channel(Progress::Done);
    drop(tx);
    ProgressStream { rx }
}
