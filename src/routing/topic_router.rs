//! Exact-match topic routing table.
//!
//! Maps a topic name to every subscription sink registered for it
//! (multimap semantics). Mutated by subscribe/unsubscribe callers, read by
//! the delivery path; a coarse reader/writer lock covers both. Wildcard
//! matching is out of scope: lookups are exact string equality.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use arcstr::ArcStr;

use super::subscription::SubscriptionSink;

/// Topic name → registered sinks, with the invariant that an entry exists
/// iff at least one sink is registered for it.
#[derive(Debug, Default)]
pub struct TopicRouter {
	routes: RwLock<HashMap<ArcStr, Vec<SubscriptionSink>>>,
}

impl TopicRouter {
	/// Creates an empty routing table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a sink under `topic`.
	pub fn register(&self, topic: ArcStr, sink: SubscriptionSink) {
		self.write().entry(topic).or_default().push(sink);
	}

	/// Remove one specific sink from `topic`, keeping any others.
	///
	/// Returns `false` if the sink was not registered.
	pub fn remove_sink(&self, topic: &str, sink: &SubscriptionSink) -> bool {
		let mut routes = self.write();
		let Some(sinks) = routes.get_mut(topic) else {
			return false;
		};
		let before = sinks.len();
		sinks.retain(|registered| !registered.same_channel(sink));
		let removed = sinks.len() < before;
		if sinks.is_empty() {
			routes.remove(topic);
		}
		removed
	}

	/// Remove every sink registered for `topic` together with its entry.
	///
	/// Returns how many sinks were removed.
	pub fn remove_topic(&self, topic: &str) -> usize {
		self.write()
			.remove(topic)
			.map(|sinks| sinks.len())
			.unwrap_or(0)
	}

	/// Snapshot of the sinks registered for `topic`.
	///
	/// The clones stay valid even if the entry is removed concurrently;
	/// pushing into a stream whose consumer is gone is benign.
	pub fn sinks_for(&self, topic: &str) -> Vec<SubscriptionSink> {
		self.read().get(topic).cloned().unwrap_or_default()
	}

	/// Number of sinks currently registered for `topic`.
	pub fn subscription_count(&self, topic: &str) -> usize {
		self.read().get(topic).map(Vec::len).unwrap_or(0)
	}

	/// All topics with at least one registered sink.
	pub fn active_topics(&self) -> Vec<ArcStr> {
		self.read().keys().cloned().collect()
	}

	// A poisoned lock only means a delivery or caller task panicked while
	// holding the guard; the table itself stays usable.
	fn read(
		&self,
	) -> std::sync::RwLockReadGuard<'_, HashMap<ArcStr, Vec<SubscriptionSink>>>
	{
		self.routes.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(
		&self,
	) -> std::sync::RwLockWriteGuard<'_, HashMap<ArcStr, Vec<SubscriptionSink>>>
	{
		self.routes.write().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use arcstr::literal;

	use super::*;
	use crate::routing::subscription::subscription_channel;

	#[test]
	fn entry_exists_iff_sinks_registered() {
		let router = TopicRouter::new();
		assert!(router.active_topics().is_empty());

		let (sink, _subscription) = subscription_channel(literal!("a/b"));
		router.register(literal!("a/b"), sink);
		assert_eq!(router.subscription_count("a/b"), 1);
		assert_eq!(router.active_topics(), vec![literal!("a/b")]);

		assert_eq!(router.remove_topic("a/b"), 1);
		assert_eq!(router.subscription_count("a/b"), 0);
		assert!(router.active_topics().is_empty());
	}

	#[test]
	fn multimap_keeps_independent_sinks_per_topic() {
		let router = TopicRouter::new();
		let (first, _s1) = subscription_channel(literal!("a"));
		let (second, _s2) = subscription_channel(literal!("a"));
		router.register(literal!("a"), first);
		router.register(literal!("a"), second);

		assert_eq!(router.subscription_count("a"), 2);
		assert_eq!(router.sinks_for("a").len(), 2);
		assert_eq!(router.remove_topic("a"), 2);
	}

	#[test]
	fn remove_sink_leaves_other_registrations() {
		let router = TopicRouter::new();
		let (first, _s1) = subscription_channel(literal!("a"));
		let (second, _s2) = subscription_channel(literal!("a"));
		router.register(literal!("a"), first.clone());
		router.register(literal!("a"), second);

		assert!(router.remove_sink("a", &first));
		assert_eq!(router.subscription_count("a"), 1);
		// Removing the same sink again reports nothing to remove.
		assert!(!router.remove_sink("a", &first));

		// Last sink out removes the entry itself.
		let remaining = router.sinks_for("a");
		assert!(router.remove_sink("a", &remaining[0]));
		assert!(router.active_topics().is_empty());
	}

	#[test]
	fn lookup_is_exact_match_only() {
		let router = TopicRouter::new();
		let (sink, _subscription) = subscription_channel(literal!("a/b"));
		router.register(literal!("a/b"), sink);

		assert_eq!(router.sinks_for("a/b").len(), 1);
		assert!(router.sinks_for("a").is_empty());
		assert!(router.sinks_for("a/b/c").is_empty());
		assert!(router.sinks_for("a/+").is_empty());
	}
}
