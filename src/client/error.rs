use rumqttc::OptionError;
use thiserror::Error;

use crate::transport::TransportError;

/// Outcome classification of a bounded-timeout publish.
///
/// Exactly one of the three is returned per call; transport faults never
/// escape the operation as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PublishStatus {
	/// The transport confirmed completion within the bound.
	Success,
	/// The bound elapsed first. The underlying publish may still complete;
	/// it is abandoned, not cancelled.
	Timeout,
	/// The transport reported an error before the bound elapsed.
	Failure,
}

/// Errors that can occur in pub/sub client operations.
#[derive(Debug, Error)]
pub enum PubSubClientError {
	/// Transport-level failure surfaced by an unbounded operation.
	#[error("transport error: {0}")]
	Transport(#[from] TransportError),

	/// Configuration errors when parsing broker options.
	#[error("configuration error: {0}")]
	Configuration(#[from] OptionError),
}
