//! Inbound message dispatch.
//!
//! [`MessageRouter::route`] is the ingestion entry point handed to the
//! transport: one call per inbound message, never blocking the transport's
//! delivery task. Each matched subscription gets its own unit of work on
//! the [`DeliveryPool`], so a slow or faulty subscriber cannot stall the
//! others or the transport.

use std::sync::Arc;

use arcstr::ArcStr;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::DeliveryError;
use super::subscription::SubscriptionSink;
use super::topic_router::TopicRouter;

type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool running delivery jobs off the transport's delivery task.
///
/// Jobs are executed in submission order, which is what preserves
/// per-stream delivery order: the router submits deliveries in transport
/// arrival order, the pool runs them in the same order, and each push into
/// an unbounded stream completes immediately.
#[derive(Debug, Clone)]
pub struct DeliveryPool {
	jobs: mpsc::UnboundedSender<DeliveryJob>,
}

impl DeliveryPool {
	/// Start the delivery worker. Must be called within a Tokio runtime.
	///
	/// The worker stops once every handle to the pool is gone.
	pub fn new() -> Self {
		let (jobs, mut job_rx) = mpsc::unbounded_channel::<DeliveryJob>();
		tokio::spawn(async move {
			while let Some(job) = job_rx.recv().await {
				job();
			}
			debug!("delivery worker stopped, all submitters gone");
		});
		Self { jobs }
	}

	/// Fire-and-forget submission; never blocks the caller.
	pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
		if self.jobs.send(Box::new(job)).is_err() {
			warn!("delivery worker gone, job dropped");
		}
	}
}

impl Default for DeliveryPool {
	fn default() -> Self {
		Self::new()
	}
}

/// Message sink exposed to the transport, owning the routing table and the
/// delivery pool.
#[derive(Debug, Clone)]
pub struct MessageRouter {
	table: Arc<TopicRouter>,
	pool: DeliveryPool,
}

impl MessageRouter {
	/// Create a router with an empty table and a fresh delivery worker.
	/// Must be called within a Tokio runtime.
	pub fn new() -> Self {
		Self {
			table: Arc::new(TopicRouter::new()),
			pool: DeliveryPool::new(),
		}
	}

	/// Ingest one inbound message: look up the sinks registered for
	/// exactly `topic` and submit one independent delivery job per match.
	///
	/// Returns immediately; nothing here waits on subscribers.
	pub fn route(&self, topic: &str, payload: Bytes) {
		let sinks = self.table.sinks_for(topic);
		if sinks.is_empty() {
			debug!(topic, payload_size = payload.len(), "no subscribers for inbound message");
			return;
		}
		debug!(
			topic,
			payload_size = payload.len(),
			subscriber_count = sinks.len(),
			"routing inbound message"
		);
		for sink in sinks {
			let payload = payload.clone();
			self.pool.submit(move || deliver(&sink, payload));
		}
	}

	pub(crate) fn register(&self, topic: ArcStr, sink: SubscriptionSink) {
		self.table.register(topic, sink);
	}

	pub(crate) fn remove_sink(
		&self,
		topic: &str,
		sink: &SubscriptionSink,
	) -> bool {
		self.table.remove_sink(topic, sink)
	}

	pub(crate) fn remove_topic(&self, topic: &str) -> usize {
		self.table.remove_topic(topic)
	}

	/// All topics with at least one active subscription.
	pub fn active_topics(&self) -> Vec<ArcStr> {
		self.table.active_topics()
	}

	/// Number of active subscription streams for `topic`.
	pub fn subscription_count(&self, topic: &str) -> usize {
		self.table.subscription_count(topic)
	}
}

impl Default for MessageRouter {
	fn default() -> Self {
		Self::new()
	}
}

/// One unit of work: push the payload onto a single stream. A fault while
/// preparing the item is captured and redirected into the stream as its
/// terminal error instead of being dropped silently.
fn deliver(sink: &SubscriptionSink, payload: Bytes) {
	match String::from_utf8(payload.to_vec()) {
		| Ok(text) => sink.insert_new_item(text),
		| Err(err) => {
			warn!(
				topic = %sink.topic(),
				payload_size = payload.len(),
				error = %err,
				"inbound payload rejected by subscriber processing, delivering terminal error"
			);
			sink.insert_error(DeliveryError::callback_fault(format!(
				"payload is not valid UTF-8: {err}"
			)));
		}
	}
}

#[cfg(test)]
mod tests {
	use arcstr::literal;

	use super::*;
	use crate::routing::subscription::subscription_channel;

	#[tokio::test]
	async fn routes_to_all_matching_sinks_in_arrival_order() {
		let router = MessageRouter::new();
		let (first_sink, mut first) = subscription_channel(literal!("t"));
		let (second_sink, mut second) = subscription_channel(literal!("t"));
		router.register(literal!("t"), first_sink);
		router.register(literal!("t"), second_sink);

		router.route("t", Bytes::from_static(b"one"));
		router.route("t", Bytes::from_static(b"two"));

		for subscription in [&mut first, &mut second] {
			assert_eq!(subscription.recv().await, Some(Ok("one".into())));
			assert_eq!(subscription.recv().await, Some(Ok("two".into())));
		}
	}

	#[tokio::test]
	async fn message_without_subscribers_is_discarded() {
		let router = MessageRouter::new();
		router.route("nobody/home", Bytes::from_static(b"x"));

		let (sink, mut subscription) = subscription_channel(literal!("t"));
		router.register(literal!("t"), sink);
		router.route("t", Bytes::from_static(b"y"));
		assert_eq!(subscription.recv().await, Some(Ok("y".into())));
	}

	#[tokio::test]
	async fn decode_fault_becomes_terminal_error_and_dispatch_survives() {
		let router = MessageRouter::new();
		let (sink, mut subscription) = subscription_channel(literal!("t"));
		router.register(literal!("t"), sink);

		router.route("t", Bytes::from_static(&[0xff, 0xfe, 0xfd]));
		router.route("t", Bytes::from_static(b"still alive"));

		assert!(matches!(
			subscription.recv().await,
			Some(Err(DeliveryError::CallbackFault(_)))
		));
		assert_eq!(subscription.recv().await, Some(Ok("still alive".into())));
	}
}
