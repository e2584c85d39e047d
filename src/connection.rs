//! Connection lifecycle state observation.
//!
//! The client owns one [`ConnectionWatch`]; explicit connect, reconnect and
//! disconnect calls drive the transitions, and any clone of the watch can
//! observe the current state without blocking.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Lifecycle states of the client's broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
	/// No connection. Initial state, and the state after `disconnect`.
	#[default]
	Disconnected,
	/// An initial connection attempt is in progress.
	Connecting,
	/// The broker acknowledged the connection.
	Connected,
	/// A reconnection attempt is in progress or has been abandoned while
	/// still running in the background.
	Reconnecting,
}

/// Shared, non-blocking view of the connection state.
#[derive(Debug, Clone)]
pub struct ConnectionWatch {
	tx: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionWatch {
	pub(crate) fn new() -> Self {
		let (tx, _rx) = watch::channel(ConnectionState::default());
		Self { tx: Arc::new(tx) }
	}

	pub(crate) fn set(&self, state: ConnectionState) {
		let previous = self.tx.send_replace(state);
		if previous != state {
			debug!(from = ?previous, to = ?state, "connection state changed");
		}
	}

	/// Current state, read without blocking and without side effects.
	pub fn current(&self) -> ConnectionState {
		*self.tx.borrow()
	}

	/// Receiver for awaiting state transitions.
	pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
		self.tx.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn starts_disconnected_and_tracks_transitions() {
		let watch = ConnectionWatch::new();
		assert_eq!(watch.current(), ConnectionState::Disconnected);

		watch.set(ConnectionState::Connecting);
		watch.set(ConnectionState::Connected);
		assert_eq!(watch.current(), ConnectionState::Connected);

		let observer = watch.clone();
		watch.set(ConnectionState::Reconnecting);
		assert_eq!(observer.current(), ConnectionState::Reconnecting);
	}

	#[tokio::test]
	async fn subscribers_see_changes() {
		let watch = ConnectionWatch::new();
		let mut rx = watch.subscribe();
		watch.set(ConnectionState::Connected);
		rx.changed().await.expect("watch sender alive");
		assert_eq!(*rx.borrow(), ConnectionState::Connected);
	}
}
