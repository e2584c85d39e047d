//! Transport seam between the client and the broker link.
//!
//! The client orchestrates; the transport owns the wire protocol. The MQTT
//! implementation lives in [`mqtt`]; tests script their own transports
//! against the same trait.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod mqtt;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
	/// Network-level failure while talking to the broker.
	#[error("network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	/// The broker refused the connection during the handshake.
	#[error("broker rejected connection: {code:?}")]
	BrokerRejected {
		/// Return code the broker answered with.
		code: rumqttc::ConnectReturnCode,
	},

	/// A request could not be handed to the broker link.
	#[error("client operation failed: {0}")]
	Client(#[from] rumqttc::ClientError),

	/// Operation attempted on a transport whose connection is gone.
	#[error("transport connection closed")]
	ConnectionClosed,

	/// Connection establishment did not finish in time.
	#[error("connection establishment timed out after {timeout_millis}ms")]
	Timeout {
		/// The bound that was exceeded.
		timeout_millis: u64,
	},

	/// TLS material could not be loaded or applied.
	#[error("TLS configuration error: {0}")]
	Tls(String),

	/// Implementation-specific fault outside the MQTT error set.
	#[error("transport fault: {0}")]
	Fault(String),
}

/// Broker link consumed by the client.
///
/// Every operation completes when the transport has acknowledged it; the
/// client layers its own timeout handling on top. Inbound messages do not
/// flow through this trait: the transport pushes them into the
/// [`MessageRouter`](crate::routing::MessageRouter) it was constructed
/// with.
#[async_trait]
pub trait PubSubTransport: Send + Sync + 'static {
	/// Establish the initial connection. No bound on the wait; an initial
	/// connection is a precondition for everything else.
	async fn connect(&self) -> Result<(), TransportError>;

	/// Wait for the link to be re-established after a drop.
	async fn reconnect(&self) -> Result<(), TransportError>;

	/// Tear the connection down and wait for confirmation.
	async fn disconnect(&self) -> Result<(), TransportError>;

	/// Current link state, observed without blocking.
	fn is_connected(&self) -> bool;

	/// Publish `payload` on `topic`, completing once the transport has
	/// accepted the message.
	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
	) -> Result<(), TransportError>;

	/// Subscribe to `topic`, completing on broker acknowledgement.
	async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

	/// Unsubscribe from `topic`, completing on broker acknowledgement.
	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;
}
