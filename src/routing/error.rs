use thiserror::Error;

/// Terminal error delivered on a subscription stream.
///
/// After this item a well-behaved consumer expects no further values,
/// although the stream itself is not force-closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
	/// Processing of a delivered message faulted; the fault is redirected
	/// into the stream instead of crashing the dispatch path.
	#[error("delivery callback fault: {0}")]
	CallbackFault(String),
}

impl DeliveryError {
	/// Creates a new CallbackFault error
	pub fn callback_fault(details: impl Into<String>) -> Self {
		Self::CallbackFault(details.into())
	}
}
