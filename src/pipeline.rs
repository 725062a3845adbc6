//! Thread plumbing for the capture pipeline.
//!
//! The camera delivers frames faster than the detector can consume them, and
//! queueing every frame would let latency (and memory) grow without bound.
//! The policy here is *keep only latest*: a frame that has not been picked up
//! by the detector when the next one arrives is simply discarded. The
//! consumer side is a plain [`crossbeam_channel::Receiver`], so it composes
//! with `select!`.

use crossbeam_channel::{Receiver, TrySendError};

/// Creates a single-slot channel that keeps only the most recent value.
///
/// Intended for a single producer; the replace step is not atomic with
/// respect to other senders.
pub fn latest_channel<T>() -> (LatestSender<T>, Receiver<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (LatestSender { inner: sender }, receiver)
}

/// The sending half of a keep-only-latest channel.
pub struct LatestSender<T> {
    inner: crossbeam_channel::Sender<T>,
}

impl<T> LatestSender<T> {
    /// Makes `value` the value the receiver will see next, discarding an
    /// undelivered previous value.
    ///
    /// Never blocks. Returns `false` if the receiver is gone and the value
    /// was dropped.
    pub fn send(&self, value: T) -> bool {
        match self.inner.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(value)) => {
                // The consumer has not taken the previous value yet; drop it
                // in favor of the new one. Only this sender adds to the slot,
                // so the retry cannot find it full again.
                let _ = self.inner.try_recv();
                self.inner.try_send(value).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
