//! # MQTT Pub/Sub Client
//!
//! A client-side abstraction over an MQTT broker: connect, publish and
//! subscribe without touching transport-level retry, timeout or delivery
//! concerns.
//!
//! ## Features
//!
//! - **Per-topic subscription streams**: each subscribe returns an ordered,
//!   lazily drained stream of payloads
//! - **Bounded-timeout operations**: publish and reconnect variants that
//!   classify their outcome instead of blocking indefinitely
//! - **Non-blocking fan-out**: inbound messages are dispatched to
//!   subscribers off the transport's delivery task
//! - **Connection lifecycle**: explicit connect/reconnect/disconnect with
//!   observable state
//! - **Async/Await Support**: built on top of `tokio`
//! - **Pluggable transport**: the broker link sits behind a trait; tests
//!   script their own
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqtt_pubsub_client::{MqttPubSubClient, PubSubClientConfig, PublishStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Simple connection using URL
//!     let config = PubSubClientConfig::from_url(
//!         "mqtt://broker.example.com:1883?client_id=sample-app",
//!     )?;
//!     let client = MqttPubSubClient::new(config);
//!     client.connect().await?;
//!
//!     // Subscribe and receive
//!     let mut subscription = client.subscribe_topic("vehicle/speed").await?;
//!
//!     // Fire-and-forget publish
//!     client.publish_on_topic("vehicle/speed", "42").await?;
//!
//!     // Bounded publish with outcome classification
//!     match client
//!         .publish_on_topic_with_timeout("vehicle/speed", "43", 500)
//!         .await
//!     {
//!         PublishStatus::Success => println!("delivered"),
//!         PublishStatus::Timeout => println!("still in flight, gave up waiting"),
//!         PublishStatus::Failure => println!("broker link reported an error"),
//!     }
//!
//!     if let Some(item) = subscription.recv().await {
//!         match item {
//!             Ok(payload) => println!("received: {payload}"),
//!             Err(err) => eprintln!("stream ended with fault: {err}"),
//!         }
//!     }
//!
//!     client.unsubscribe_topic("vehicle/speed").await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! The broker connection supports anonymous access, username/password,
//! bearer token, or TLS mutual authentication, one mode at a time:
//!
//! ```rust
//! use mqtt_pubsub_client::PubSubClientConfig;
//!
//! let with_password = PubSubClientConfig::new("app", "broker", 1883)
//!     .with_credentials("user", "secret");
//!
//! let with_mtls = PubSubClientConfig::new("app", "broker", 8883)
//!     .with_tls_auth("ca.pem", "client.pem", "client.key");
//! ```
//!
//! ## Timeout semantics
//!
//! Bounded operations take a timeout in milliseconds. Non-positive values
//! are rejected without touching the broker (the bounded publish reports
//! `Timeout`, reconnect logs and returns); values above 30 000 ms are
//! capped. When a bounded wait expires, the underlying operation keeps
//! running unobserved; it is abandoned, never cancelled or retried.

#![warn(missing_docs)]

// Core modules
pub mod client;
pub mod connection;
pub mod result_channel;
pub mod routing;
pub mod transport;

// === Core Public API ===
pub use client::{
	AuthCredentials, ClientSettings, PubSubClient, PubSubClientConfig,
	PubSubClientError, PublishStatus, TlsAuthPaths,
};
pub use connection::{ConnectionState, ConnectionWatch};
pub use routing::{AsyncSubscription, MessageRouter, SubscriptionItem};
// Essential external types
pub use rumqttc::QoS;
pub use transport::mqtt::MqttTransport;
pub use transport::{PubSubTransport, TransportError};

/// Result type alias for operations that may fail with
/// [`PubSubClientError`].
pub type Result<T> = std::result::Result<T, PubSubClientError>;

/// Convenience alias for the MQTT-backed client.
pub type MqttPubSubClient = PubSubClient<MqttTransport>;

/// Prelude module for convenient imports
///
/// Essential types for most applications:
///
/// ```rust
/// use mqtt_pubsub_client::prelude::*;
/// ```
pub mod prelude {

	pub use crate::{
		AsyncSubscription, ClientSettings, ConnectionState, MqttPubSubClient,
		PubSubClient, PubSubClientConfig, PubSubClientError, PublishStatus,
		QoS, Result,
	};
}

/// Error types used throughout the library
///
/// Re-exports all error types in one convenient location for error
/// handling.
pub mod errors {

	pub use crate::client::PubSubClientError;
	pub use crate::result_channel::AwaitError;
	pub use crate::routing::DeliveryError;
	pub use crate::transport::TransportError;
}
