//! MQTT transport backed by `rumqttc`.
//!
//! Construction is configuration only; `connect()` performs the first
//! broker handshake and then spawns the long-running event-loop task that
//! feeds inbound messages into the [`MessageRouter`] and keeps the link
//! alive across broker drops.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::Packet::{self, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop, QoS};
use rumqttc::{Event::Incoming, Event::Outgoing};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::{PubSubTransport, TransportError};
use crate::client::config::{AuthCredentials, PubSubClientConfig, TlsAuthPaths};
use crate::routing::MessageRouter;

/// Link status maintained by the event-loop task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStatus {
	/// Constructed but never connected.
	Idle,
	/// The broker acknowledged the connection.
	Online,
	/// The link dropped; the event loop is retrying.
	Offline,
	/// The event loop terminated; no further retries.
	Closed,
}

/// MQTT broker link.
///
/// Inbound `PUBLISH` packets are routed through the [`MessageRouter`]
/// handed to [`new`](Self::new); all other operations go through the trait.
#[derive(Debug)]
pub struct MqttTransport {
	config: PubSubClientConfig,
	router: MessageRouter,
	client: Mutex<Option<AsyncClient>>,
	event_loop_handle: Mutex<Option<JoinHandle<()>>>,
	status: Arc<watch::Sender<LinkStatus>>,
}

impl MqttTransport {
	/// Create a transport from configuration. No I/O happens here.
	pub fn new(config: PubSubClientConfig, router: MessageRouter) -> Self {
		let (status, _) = watch::channel(LinkStatus::Idle);
		Self {
			config,
			router,
			client: Mutex::new(None),
			event_loop_handle: Mutex::new(None),
			status: Arc::new(status),
		}
	}

	fn build_options(&self) -> Result<rumqttc::MqttOptions, TransportError> {
		let mut options = self.config.connection.clone();
		let settings = &self.config.settings;
		options.set_keep_alive(settings.keep_alive);
		options.set_clean_session(settings.clean_session);
		match &self.config.auth {
			| AuthCredentials::None => {}
			| AuthCredentials::UsernamePassword { username, password } => {
				options.set_credentials(username.as_str(), password.as_str());
			}
			| AuthCredentials::Token(token) => {
				// The token travels as the MQTT username, no password.
				options.set_credentials(token.as_str(), "");
			}
			| AuthCredentials::Tls(paths) => {
				options.set_transport(rumqttc::Transport::tls_with_config(
					load_tls_config(paths)?,
				));
			}
		}
		Ok(options)
	}

	fn client_handle(&self) -> Result<AsyncClient, TransportError> {
		self.client
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
			.ok_or(TransportError::ConnectionClosed)
	}

	/// Poll the fresh event loop until the broker answers the handshake.
	async fn await_conn_ack(
		event_loop: &mut EventLoop,
	) -> Result<(), TransportError> {
		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					code: ConnectReturnCode::Success,
					..
				}))) => {
					debug!("broker accepted connection");
					return Ok(());
				}
				| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
					return Err(TransportError::BrokerRejected { code });
				}
				| Ok(event) => {
					debug!(event = ?event, "handshake phase event");
				}
				| Err(err) => return Err(TransportError::Network(err)),
			}
		}
	}

	/// Event loop driving the established link.
	///
	/// Terminates on an incoming or outgoing `DISCONNECT`, or after too
	/// many consecutive poll errors. Poll errors back off exponentially
	/// while `rumqttc` retries the connection underneath.
	async fn run(
		mut event_loop: EventLoop,
		client: AsyncClient,
		router: MessageRouter,
		status: Arc<watch::Sender<LinkStatus>>,
		qos: QoS,
	) {
		const MAX_CONSECUTIVE_ERRORS: u32 = 10;
		const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
		const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
		let mut error_count: u32 = 0;

		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					status.send_replace(LinkStatus::Online);
					if session_present {
						info!("reconnected, broker session preserved");
					} else {
						info!(
							"reconnected without broker session, renewing \
							 subscriptions"
						);
						renew_subscriptions(&client, &router, qos).await;
					}
				}
				| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
					status.send_replace(LinkStatus::Offline);
					warn!(code = ?code, "broker rejected reconnection");
				}
				| Ok(Incoming(Publish(publish))) => {
					error_count = 0;
					debug!(
						topic = %publish.topic,
						payload_size = publish.payload.len(),
						"received message"
					);
					router.route(&publish.topic, publish.payload);
				}
				| Ok(Incoming(Packet::Disconnect)) => {
					info!("broker closed the connection");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("disconnect sent to broker");
					break;
				}
				| Ok(event) => {
					error_count = 0;
					debug!(event = ?event, "broker event");
				}
				| Err(err) => {
					status.send_replace(LinkStatus::Offline);
					error_count += 1;
					error!(error = %err, error_count, "broker link error");
					if error_count >= MAX_CONSECUTIVE_ERRORS {
						error!(
							max_errors = MAX_CONSECUTIVE_ERRORS,
							"too many consecutive link errors, stopping \
							 event loop"
						);
						break;
					}
					let delay = (INITIAL_RETRY_DELAY
						* 2_u32.pow((error_count - 1).min(10)))
					.min(MAX_RETRY_DELAY);
					warn!(delay = ?delay, "retrying broker link");
					time::sleep(delay).await;
				}
			}
		}
		status.send_replace(LinkStatus::Closed);
		info!("event loop terminated");
	}
}

#[async_trait]
impl PubSubTransport for MqttTransport {
	async fn connect(&self) -> Result<(), TransportError> {
		let options = self.build_options()?;
		let (host, port) = options.broker_address();
		info!(
			host = %host,
			port,
			client_id = %options.client_id(),
			"connecting to MQTT broker"
		);

		let (client, mut event_loop) = AsyncClient::new(
			options,
			self.config.settings.event_loop_capacity,
		);

		let timeout_millis = self.config.settings.connection_timeout_millis;
		time::timeout(
			Duration::from_millis(timeout_millis),
			Self::await_conn_ack(&mut event_loop),
		)
		.await
		.map_err(|_| TransportError::Timeout { timeout_millis })??;

		self.status.send_replace(LinkStatus::Online);
		*self.client.lock().unwrap_or_else(PoisonError::into_inner) =
			Some(client.clone());

		let handle = tokio::spawn(Self::run(
			event_loop,
			client,
			self.router.clone(),
			Arc::clone(&self.status),
			self.config.settings.qos,
		));
		*self
			.event_loop_handle
			.lock()
			.unwrap_or_else(PoisonError::into_inner) = Some(handle);
		Ok(())
	}

	async fn reconnect(&self) -> Result<(), TransportError> {
		// rumqttc performs the actual retries inside the event loop; this
		// waits for the link to come back.
		let mut status_rx = self.status.subscribe();
		let status = *status_rx
			.wait_for(|status| {
				matches!(status, LinkStatus::Online | LinkStatus::Closed)
			})
			.await
			.map_err(|_| TransportError::ConnectionClosed)?;
		match status {
			| LinkStatus::Online => Ok(()),
			| _ => Err(TransportError::ConnectionClosed),
		}
	}

	async fn disconnect(&self) -> Result<(), TransportError> {
		let client = self.client_handle()?;
		client.disconnect().await?;
		// The event loop sees Outgoing(Disconnect) and terminates; wait
		// for it so every in-flight inbound message was routed.
		let handle = self
			.event_loop_handle
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		if let Some(handle) = handle {
			if let Err(err) = handle.await {
				warn!(error = %err, "event loop task failed during shutdown");
			}
		}
		Ok(())
	}

	fn is_connected(&self) -> bool {
		*self.status.borrow() == LinkStatus::Online
	}

	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
	) -> Result<(), TransportError> {
		let client = self.client_handle()?;
		client
			.publish(
				topic,
				self.config.settings.qos,
				false,
				payload.to_vec(),
			)
			.await?;
		Ok(())
	}

	async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
		let client = self.client_handle()?;
		client.subscribe(topic, self.config.settings.qos).await?;
		Ok(())
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
		let client = self.client_handle()?;
		client.unsubscribe(topic).await?;
		Ok(())
	}
}

/// Re-issue broker subscriptions for every topic with active streams.
async fn renew_subscriptions(
	client: &AsyncClient,
	router: &MessageRouter,
	qos: QoS,
) {
	for topic in router.active_topics() {
		if let Err(err) = client.subscribe(topic.as_str(), qos).await {
			error!(topic = %topic, error = %err, "failed to renew subscription");
		}
	}
}

fn load_tls_config(
	paths: &TlsAuthPaths,
) -> Result<rumqttc::TlsConfiguration, TransportError> {
	let read = |label: &str, path: &std::path::Path| {
		std::fs::read(path).map_err(|err| {
			TransportError::Tls(format!(
				"failed to read {label} '{}': {err}",
				path.display()
			))
		})
	};
	let ca = read("trust store", &paths.trust_store)?;
	let client_cert = read("key store", &paths.key_store)?;
	let client_key = read("private key", &paths.private_key)?;
	Ok(rumqttc::TlsConfiguration::Simple {
		ca,
		alpn: None,
		client_auth: Some((client_cert, client_key)),
	})
}
