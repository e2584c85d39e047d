//! Single-slot asynchronous result handoff.
//!
//! A producer fulfils the channel exactly once; a consumer awaits the
//! result, optionally with a timeout. Fulfilling twice is unrepresentable:
//! [`ResultSender::fulfil`] consumes the sender.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// Reasons a result never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AwaitError {
	/// The producer was dropped before fulfilling the channel.
	#[error("result abandoned by producer")]
	Abandoned,
	/// The bounded wait elapsed before fulfilment.
	#[error("result not available within timeout")]
	Timeout,
}

/// Producer half of a result channel.
///
/// Consumed by [`fulfil`](Self::fulfil), so a result can be produced at
/// most once.
#[derive(Debug)]
pub struct ResultSender<T>(oneshot::Sender<T>);

impl<T> ResultSender<T> {
	/// Store the result. A consumer that already gave up is not an error;
	/// the value is simply discarded.
	pub fn fulfil(self, value: T) {
		if self.0.send(value).is_err() {
			debug!("result receiver dropped before fulfilment");
		}
	}
}

/// Consumer half of a result channel.
///
/// Awaiting after the producer has already fulfilled the channel returns
/// immediately with the stored result.
#[derive(Debug)]
pub struct ResultReceiver<T>(oneshot::Receiver<T>);

impl<T> ResultReceiver<T> {
	/// Wait for the result without a bound.
	pub async fn recv(self) -> Result<T, AwaitError> {
		self.0.await.map_err(|_| AwaitError::Abandoned)
	}

	/// Wait for the result up to `timeout`.
	///
	/// On [`AwaitError::Timeout`] the producer keeps running; its eventual
	/// result is discarded when it fulfils a channel nobody listens to.
	pub async fn recv_timeout(
		self,
		timeout: Duration,
	) -> Result<T, AwaitError> {
		match tokio::time::timeout(timeout, self.0).await {
			| Ok(Ok(value)) => Ok(value),
			| Ok(Err(_)) => Err(AwaitError::Abandoned),
			| Err(_) => Err(AwaitError::Timeout),
		}
	}
}

/// Create a connected sender/receiver pair.
pub fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
	let (tx, rx) = oneshot::channel();
	(ResultSender(tx), ResultReceiver(rx))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn recv_returns_fulfilled_value() {
		let (tx, rx) = result_channel();
		tx.fulfil(7_u32);
		assert_eq!(rx.recv().await, Ok(7));
	}

	#[tokio::test]
	async fn recv_after_fulfilment_is_immediate() {
		let (tx, rx) = result_channel();
		tx.fulfil("done");
		// No timer is needed; the stored result is already there.
		assert_eq!(
			rx.recv_timeout(Duration::from_millis(1)).await,
			Ok("done")
		);
	}

	#[tokio::test]
	async fn dropped_sender_reports_abandoned() {
		let (tx, rx) = result_channel::<u32>();
		drop(tx);
		assert_eq!(rx.recv().await, Err(AwaitError::Abandoned));
	}

	#[tokio::test(start_paused = true)]
	async fn bounded_wait_reports_timeout() {
		let (tx, rx) = result_channel::<u32>();
		let waiter = tokio::spawn(async move {
			rx.recv_timeout(Duration::from_millis(50)).await
		});
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(waiter.await.unwrap(), Err(AwaitError::Timeout));
		tx.fulfil(1); // late fulfilment is discarded, not an error
	}
}
