//! Configuration for client construction.

use std::path::PathBuf;
use std::time::Duration;

use rumqttc::{MqttOptions, OptionError, QoS};

/// Authentication material presented to the broker.
///
/// The modes are mutually exclusive; setting one replaces any other.
#[derive(Debug, Clone, Default)]
pub enum AuthCredentials {
	/// Anonymous connection.
	#[default]
	None,
	/// Username/password pair.
	UsernamePassword {
		/// Username registered with the broker.
		username: String,
		/// Password for the username.
		password: String,
	},
	/// Bearer token, transmitted as the MQTT username.
	Token(String),
	/// Mutual TLS with client certificate authentication.
	Tls(TlsAuthPaths),
}

/// File paths for TLS mutual authentication.
#[derive(Debug, Clone)]
pub struct TlsAuthPaths {
	/// Certificates trusted by the client (CA bundle), PEM.
	pub trust_store: PathBuf,
	/// Public certificate chain of the client, PEM.
	pub key_store: PathBuf,
	/// Private key of the client, PEM.
	pub private_key: PathBuf,
}

/// Client-level behavior settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Keep-alive interval announced to the broker.
	pub keep_alive: Duration,
	/// Whether the broker should drop session state between connections.
	pub clean_session: bool,
	/// Bound on the initial connection handshake, in milliseconds.
	pub connection_timeout_millis: u64,
	/// Quality of service used for publishes and subscriptions.
	pub qos: QoS,
	/// Capacity of the event loop's request channel.
	pub event_loop_capacity: usize,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			keep_alive: Duration::from_secs(30),
			clean_session: true,
			connection_timeout_millis: 10_000,
			qos: QoS::AtMostOnce,
			event_loop_capacity: 10,
		}
	}
}

/// Configuration for creating a pub/sub client.
#[derive(Debug, Clone)]
pub struct PubSubClientConfig {
	/// Broker connection options (address and client identifier).
	pub connection: MqttOptions,
	/// Authentication mode.
	pub auth: AuthCredentials,
	/// Client-level behavior settings.
	pub settings: ClientSettings,
}

impl PubSubClientConfig {
	/// Create a config for a broker at `host:port` with default settings.
	pub fn new(client_id: &str, host: &str, port: u16) -> Self {
		Self {
			connection: MqttOptions::new(client_id, host, port),
			auth: AuthCredentials::default(),
			settings: ClientSettings::default(),
		}
	}

	/// Parse broker address and client identifier from a URL.
	///
	/// Supports `tcp://`, `mqtt://`, `ssl://` and `mqtts://`; the client
	/// identifier travels as the `client_id` query parameter.
	pub fn from_url(url: &str) -> Result<Self, OptionError> {
		Ok(Self {
			connection: MqttOptions::parse_url(url)?,
			auth: AuthCredentials::default(),
			settings: ClientSettings::default(),
		})
	}

	/// Create a config for a broker on `localhost:1883`.
	pub fn localhost(client_id: &str) -> Self {
		Self::new(client_id, "localhost", 1883)
	}

	/// Authenticate with a username/password pair.
	pub fn with_credentials(
		mut self,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		self.auth = AuthCredentials::UsernamePassword {
			username: username.into(),
			password: password.into(),
		};
		self
	}

	/// Authenticate with a bearer token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.auth = AuthCredentials::Token(token.into());
		self
	}

	/// Authenticate with TLS client certificates.
	pub fn with_tls_auth(
		mut self,
		trust_store: impl Into<PathBuf>,
		key_store: impl Into<PathBuf>,
		private_key: impl Into<PathBuf>,
	) -> Self {
		self.auth = AuthCredentials::Tls(TlsAuthPaths {
			trust_store: trust_store.into(),
			key_store: key_store.into(),
			private_key: private_key.into(),
		});
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn auth_modes_are_mutually_exclusive() {
		let config = PubSubClientConfig::localhost("app")
			.with_credentials("user", "secret")
			.with_token("bearer-token");
		assert!(matches!(config.auth, AuthCredentials::Token(_)));

		let config = config.with_tls_auth("ca.pem", "client.pem", "key.pem");
		assert!(matches!(config.auth, AuthCredentials::Tls(_)));
	}

	#[test]
	fn from_url_carries_address_and_client_id() {
		let config = PubSubClientConfig::from_url(
			"mqtt://broker.example.com:1883?client_id=sample-app",
		)
		.expect("valid url");
		let (host, port) = config.connection.broker_address();
		assert_eq!(host, "broker.example.com");
		assert_eq!(port, 1883);
		assert_eq!(config.connection.client_id(), "sample-app");
	}
}
