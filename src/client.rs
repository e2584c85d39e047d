//! Pub/sub client: orchestration, configuration and error types.

pub mod config;
pub mod error;
pub mod pubsub_client;


pub use config::{
	AuthCredentials, ClientSettings, PubSubClientConfig, TlsAuthPaths,
};
pub use error::{PubSubClientError, PublishStatus};
pub use pubsub_client::PubSubClient;
