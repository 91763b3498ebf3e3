//! Caller-held abort signal for in-flight token exchanges.

// crates.io
use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Sender half of an abort signal.
///
/// Cancelling is idempotent and permanent. Dropping the handle without cancelling leaves
/// the paired signals unfired forever.
#[derive(Debug)]
pub struct CancelHandle {
	tx: watch::Sender<bool>,
}
impl CancelHandle {
	/// Creates a fresh handle/signal pair.
	pub fn new() -> (Self, CancelSignal) {
		let (tx, rx) = watch::channel(false);

		(Self { tx }, CancelSignal { rx })
	}

	/// Fires the signal; every live [`CancelSignal`] clone observes it.
	pub fn cancel(&self) {
		// Receivers may all be gone already; cancelling is still a no-op success then.
		let _ = self.tx.send(true);
	}
}

/// Receiver half of an abort signal, cheap to clone and attach to exchange options.
#[derive(Clone, Debug)]
pub struct CancelSignal {
	rx: watch::Receiver<bool>,
}
impl CancelSignal {
	/// Resolves once the paired handle fires; pends forever if the handle is dropped
	/// without firing.
	pub async fn cancelled(mut self) {
		if *self.rx.borrow() {
			return;
		}

		while self.rx.changed().await.is_ok() {
			if *self.rx.borrow() {
				return;
			}
		}

		std::future::pending::<()>().await
	}
}
