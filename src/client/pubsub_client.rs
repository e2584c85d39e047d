//! Pub/sub client orchestration.

use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::config::PubSubClientConfig;
use super::error::{PubSubClientError, PublishStatus};
use crate::connection::{ConnectionState, ConnectionWatch};
use crate::result_channel::{AwaitError, result_channel};
use crate::routing::{AsyncSubscription, MessageRouter, subscription_channel};
use crate::transport::mqtt::MqttTransport;
use crate::transport::PubSubTransport;

/// Upper bound applied to every caller-supplied timeout.
const MAX_TIMEOUT_MS: i64 = 30_000;

/// Pub/sub client over a broker transport.
///
/// Owns the topic routing table, the connection state and the transport
/// handle; exposes connect/reconnect/disconnect, publish in unbounded and
/// bounded-timeout variants, and per-topic subscription streams.
#[derive(Debug)]
pub struct PubSubClient<T> {
	transport: Arc<T>,
	router: MessageRouter,
	state: ConnectionWatch,
}

impl<T> Clone for PubSubClient<T> {
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			router: self.router.clone(),
			state: self.state.clone(),
		}
	}
}

impl PubSubClient<MqttTransport> {
	/// Create an MQTT-backed client.
	///
	/// Configuration only; no I/O until [`connect`](Self::connect). Must
	/// be called within a Tokio runtime.
	pub fn new(config: PubSubClientConfig) -> Self {
		let router = MessageRouter::new();
		let transport = MqttTransport::new(config, router.clone());
		Self::with_transport(transport, router)
	}
}

impl<T> PubSubClient<T>
where T: PubSubTransport
{
	/// Create a client over an arbitrary transport.
	///
	/// `router` must be the same message router the transport delivers
	/// inbound messages to.
	pub fn with_transport(transport: T, router: MessageRouter) -> Self {
		Self {
			transport: Arc::new(transport),
			router,
			state: ConnectionWatch::new(),
		}
	}

	/// Connect to the broker, waiting without bound for the attempt to
	/// complete. Transport faults propagate: an initial connection is a
	/// precondition for every other operation.
	pub async fn connect(&self) -> Result<(), PubSubClientError> {
		info!("connecting to broker");
		self.state.set(ConnectionState::Connecting);
		match self.transport.connect().await {
			| Ok(()) => {
				self.state.set(ConnectionState::Connected);
				info!("connected to broker");
				Ok(())
			}
			| Err(err) => {
				self.state.set(ConnectionState::Disconnected);
				Err(err.into())
			}
		}
	}

	/// Attempt to reconnect, waiting up to `timeout_ms` milliseconds.
	///
	/// A non-positive `timeout_ms` is rejected without touching the
	/// transport; values above 30 000 ms are capped. When the wait times
	/// out the attempt keeps running in the background (abandoned, not
	/// cancelled) and the connection state converges once it resolves.
	/// Every outcome is reported through the log.
	pub async fn reconnect(&self, timeout_ms: i64) {
		info!("attempting to reconnect to broker");
		let Some(timeout) = effective_timeout(timeout_ms) else {
			error!(timeout_ms, "invalid reconnect timeout, must be positive");
			return;
		};

		self.state.set(ConnectionState::Reconnecting);
		let (result_tx, result_rx) = result_channel();
		let transport = Arc::clone(&self.transport);
		let state = self.state.clone();
		tokio::spawn(async move {
			let outcome = transport.reconnect().await;
			state.set(match outcome {
				| Ok(()) => ConnectionState::Connected,
				| Err(_) => ConnectionState::Disconnected,
			});
			result_tx.fulfil(outcome);
		});

		match result_rx.recv_timeout(timeout).await {
			| Ok(Ok(())) => info!("reconnected to broker"),
			| Ok(Err(err)) => error!(error = %err, "reconnect failed"),
			| Err(AwaitError::Timeout) => error!(
				timeout_ms = timeout.as_millis() as u64,
				"reconnect timed out, attempt left running"
			),
			| Err(AwaitError::Abandoned) => {
				error!("reconnect attempt aborted before completion");
			}
		}
	}

	/// Disconnect from the broker, waiting for confirmation. Transport
	/// faults propagate.
	pub async fn disconnect(&self) -> Result<(), PubSubClientError> {
		info!("disconnecting from broker");
		self.transport.disconnect().await?;
		self.state.set(ConnectionState::Disconnected);
		info!("disconnected from broker");
		Ok(())
	}

	/// Current transport link state, observed without blocking.
	pub fn is_connected(&self) -> bool {
		self.transport.is_connected()
	}

	/// The client's connection lifecycle state, observed without blocking.
	pub fn connection_state(&self) -> ConnectionState {
		self.state.current()
	}

	/// Watch handle for awaiting connection state transitions.
	pub fn connection_watch(&self) -> &ConnectionWatch {
		&self.state
	}

	/// Publish `payload` on `topic`, waiting without bound for the
	/// transport to accept it. Transport failures propagate; there is no
	/// retry.
	pub async fn publish_on_topic(
		&self,
		topic: &str,
		payload: impl Into<Bytes>,
	) -> Result<(), PubSubClientError> {
		debug!(topic, "publishing");
		self.transport.publish(topic, payload.into()).await?;
		Ok(())
	}

	/// Publish `payload` on `topic` with a bounded wait of `timeout_ms`
	/// milliseconds, classifying the outcome.
	///
	/// A non-positive `timeout_ms` yields [`PublishStatus::Timeout`]
	/// without invoking the transport; values above 30 000 ms are capped.
	/// On [`PublishStatus::Timeout`] the underlying publish keeps running
	/// unobserved: abandoned, not cancelled and not retried.
	pub async fn publish_on_topic_with_timeout(
		&self,
		topic: impl Into<ArcStr>,
		payload: impl Into<Bytes>,
		timeout_ms: i64,
	) -> PublishStatus {
		let topic = topic.into();
		let Some(timeout) = effective_timeout(timeout_ms) else {
			warn!(
				timeout_ms,
				topic = %topic,
				"invalid publish timeout, must be positive"
			);
			return PublishStatus::Timeout;
		};

		debug!(topic = %topic, "publishing with bounded wait");
		let (result_tx, result_rx) = result_channel();
		let transport = Arc::clone(&self.transport);
		let job_topic = topic.clone();
		let payload = payload.into();
		tokio::spawn(async move {
			result_tx
				.fulfil(transport.publish(job_topic.as_str(), payload).await);
		});

		match result_rx.recv_timeout(timeout).await {
			| Ok(Ok(())) => PublishStatus::Success,
			| Ok(Err(err)) => {
				error!(topic = %topic, error = %err, "publish failed");
				PublishStatus::Failure
			}
			| Err(AwaitError::Timeout) => {
				warn!(
					topic = %topic,
					timeout_ms = timeout.as_millis() as u64,
					"publish timed out, left running unobserved"
				);
				PublishStatus::Timeout
			}
			| Err(AwaitError::Abandoned) => {
				error!(topic = %topic, "publish task dropped its result");
				PublishStatus::Failure
			}
		}
	}

	/// Subscribe to `topic` and return its stream of payloads.
	///
	/// The stream is registered before the broker subscribe request is
	/// issued, so a delivery racing the acknowledgement is delivered
	/// rather than lost; nothing arrives before the acknowledgement.
	pub async fn subscribe_topic(
		&self,
		topic: impl Into<ArcStr>,
	) -> Result<AsyncSubscription, PubSubClientError> {
		let topic = topic.into();
		debug!(topic = %topic, "subscribing");
		let (sink, subscription) = subscription_channel(topic.clone());
		self.router.register(topic.clone(), sink.clone());
		if let Err(err) = self.transport.subscribe(topic.as_str()).await {
			self.router.remove_sink(&topic, &sink);
			error!(topic = %topic, error = %err, "subscribe failed");
			return Err(err.into());
		}
		Ok(subscription)
	}

	/// Unsubscribe from `topic`, waiting for the broker acknowledgement,
	/// then drop every stream registered for it.
	///
	/// All subscriptions for the topic are cut together, including ones
	/// created by other callers of this client. Streams already handed
	/// out stay valid and drain whatever was queued, but receive nothing
	/// further. Callers that need isolation should use distinct clients.
	pub async fn unsubscribe_topic(
		&self,
		topic: &str,
	) -> Result<(), PubSubClientError> {
		debug!(topic, "unsubscribing");
		self.transport.unsubscribe(topic).await?;
		let removed = self.router.remove_topic(topic);
		if removed == 0 {
			warn!(topic, "no active subscriptions for topic");
		}
		Ok(())
	}

	/// The ingestion entry point for inbound messages, to be handed to a
	/// transport collaborator.
	pub fn message_router(&self) -> &MessageRouter {
		&self.router
	}
}

/// Validate and cap a caller-supplied timeout.
///
/// `None` means the value is invalid and the operation must be rejected;
/// capping is reported through the log but otherwise silent.
fn effective_timeout(timeout_ms: i64) -> Option<Duration> {
	if timeout_ms <= 0 {
		return None;
	}
	if timeout_ms > MAX_TIMEOUT_MS {
		warn!(
			requested_ms = timeout_ms,
			capped_ms = MAX_TIMEOUT_MS,
			"timeout capped"
		);
		return Some(Duration::from_millis(MAX_TIMEOUT_MS as u64));
	}
	Some(Duration::from_millis(timeout_ms as u64))
}

#[cfg(test)]
mod effective_timeout_tests {
	use super::*;

	#[test]
	fn non_positive_is_rejected() {
		assert_eq!(effective_timeout(0), None);
		assert_eq!(effective_timeout(-5), None);
		assert_eq!(effective_timeout(i64::MIN), None);
	}

	#[test]
	fn values_above_cap_are_clamped_to_exactly_30s() {
		assert_eq!(
			effective_timeout(50_000),
			Some(Duration::from_millis(30_000))
		);
		assert_eq!(
			effective_timeout(i64::MAX),
			Some(Duration::from_millis(30_000))
		);
	}

	#[test]
	fn values_within_range_pass_through() {
		assert_eq!(effective_timeout(1), Some(Duration::from_millis(1)));
		assert_eq!(
			effective_timeout(30_000),
			Some(Duration::from_millis(30_000))
		);
	}
}
