//! End-to-end exercise of the public API against a scripted transport:
//! connect, subscribe, inject inbound traffic, publish with a bound,
//! unsubscribe, disconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use mqtt_pubsub_client::{
	ConnectionState, MessageRouter, PubSubClient, PubSubTransport,
	PublishStatus, TransportError,
};

/// Transport that acknowledges everything immediately and loops published
/// messages straight back into the router, like a broker echoing to a
/// subscriber of the same topic.
#[derive(Clone)]
struct LoopbackTransport {
	router: MessageRouter,
	connected: Arc<AtomicBool>,
}

impl LoopbackTransport {
	fn new(router: MessageRouter) -> Self {
		Self {
			router,
			connected: Arc::new(AtomicBool::new(false)),
		}
	}
}

#[async_trait]
impl PubSubTransport for LoopbackTransport {
	async fn connect(&self) -> Result<(), TransportError> {
		self.connected.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn reconnect(&self) -> Result<(), TransportError> {
		self.connected.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), TransportError> {
		self.connected.store(false, Ordering::SeqCst);
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
	) -> Result<(), TransportError> {
		if !self.is_connected() {
			return Err(TransportError::ConnectionClosed);
		}
		self.router.route(topic, payload);
		Ok(())
	}

	async fn subscribe(&self, _topic: &str) -> Result<(), TransportError> {
		Ok(())
	}

	async fn unsubscribe(&self, _topic: &str) -> Result<(), TransportError> {
		Ok(())
	}
}

#[tokio::test]
async fn publish_roundtrip_reaches_all_subscribers_in_order() {
	let router = MessageRouter::new();
	let client = PubSubClient::with_transport(
		LoopbackTransport::new(router.clone()),
		router,
	);

	client.connect().await.expect("connect");
	assert!(client.is_connected());
	assert_eq!(client.connection_state(), ConnectionState::Connected);

	let mut first = client
		.subscribe_topic("test/topic")
		.await
		.expect("subscribe");
	let mut second = client
		.subscribe_topic("test/topic")
		.await
		.expect("subscribe");

	client
		.publish_on_topic("test/topic", "42")
		.await
		.expect("publish");
	let status = client
		.publish_on_topic_with_timeout("test/topic", "43", 1_000)
		.await;
	assert_eq!(status, PublishStatus::Success);

	for subscription in [&mut first, &mut second] {
		assert_eq!(subscription.recv().await, Some(Ok("42".into())));
		assert_eq!(subscription.recv().await, Some(Ok("43".into())));
	}

	client
		.unsubscribe_topic("test/topic")
		.await
		.expect("unsubscribe");
	// Both streams were cut together by the per-topic unsubscribe.
	client
		.publish_on_topic("test/topic", "44")
		.await
		.expect("publish");
	assert_eq!(first.recv().await, None);
	assert_eq!(second.recv().await, None);

	client.disconnect().await.expect("disconnect");
	assert!(!client.is_connected());
}

#[tokio::test]
async fn messages_on_other_topics_are_not_delivered() {
	let router = MessageRouter::new();
	let client = PubSubClient::with_transport(
		LoopbackTransport::new(router.clone()),
		router,
	);
	client.connect().await.expect("connect");

	let mut subscription = client
		.subscribe_topic("vehicle/speed")
		.await
		.expect("subscribe");

	client
		.publish_on_topic("vehicle/rpm", "3000")
		.await
		.expect("publish");
	client
		.publish_on_topic("vehicle/speed", "88")
		.await
		.expect("publish");

	// Only the exact-match topic arrives.
	assert_eq!(subscription.recv().await, Some(Ok("88".into())));
}
