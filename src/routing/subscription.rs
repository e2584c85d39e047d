//! Per-topic subscription streams.
//!
//! A subscription is an unbounded, ordered channel bound to one topic. The
//! routing table holds the producer side ([`SubscriptionSink`], cloneable,
//! safe to feed from concurrent delivery jobs); the caller holds the
//! consumer side ([`AsyncSubscription`]) and drains it lazily.

use arcstr::ArcStr;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::DeliveryError;

/// One delivered payload, or the stream's terminal error.
pub type SubscriptionItem = Result<String, DeliveryError>;

/// Producer side of a subscription stream.
#[derive(Debug, Clone)]
pub struct SubscriptionSink {
	topic: ArcStr,
	sender: mpsc::UnboundedSender<SubscriptionItem>,
}

impl SubscriptionSink {
	/// Append a delivered payload to the stream.
	///
	/// A consumer that already dropped its handle is not an error; the
	/// item is discarded.
	pub fn insert_new_item(&self, item: String) {
		if self.sender.send(Ok(item)).is_err() {
			debug!(topic = %self.topic, "subscriber gone, delivered item dropped");
		}
	}

	/// Append a terminal error marker to the stream.
	pub fn insert_error(&self, error: DeliveryError) {
		if self.sender.send(Err(error)).is_err() {
			debug!(topic = %self.topic, "subscriber gone, terminal error dropped");
		}
	}

	/// Topic this sink feeds.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	pub(crate) fn same_channel(&self, other: &Self) -> bool {
		self.sender.same_channel(&other.sender)
	}
}

/// Consumer side of a subscription stream.
///
/// Created via `PubSubClient::subscribe_topic`. Remains valid after an
/// unsubscribe: whatever was queued before removal still drains, then
/// [`recv`](Self::recv) reports the end of the stream.
#[derive(Debug)]
pub struct AsyncSubscription {
	topic: ArcStr,
	receiver: mpsc::UnboundedReceiver<SubscriptionItem>,
}

impl AsyncSubscription {
	/// Receive the next item, waiting as long as necessary.
	///
	/// Returns `None` once every producer is gone and the queue is
	/// drained.
	pub async fn recv(&mut self) -> Option<SubscriptionItem> {
		self.receiver.recv().await
	}

	/// Topic this subscription was created for.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}
}

/// Create a connected sink/subscription pair for `topic`.
pub fn subscription_channel(
	topic: ArcStr,
) -> (SubscriptionSink, AsyncSubscription) {
	let (sender, receiver) = mpsc::unbounded_channel();
	(
		SubscriptionSink {
			topic: topic.clone(),
			sender,
		},
		AsyncSubscription { topic, receiver },
	)
}
