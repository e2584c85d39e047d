//! Message routing: subscription streams, the exact-match routing table
//! and the delivery dispatch that fans inbound messages out to them.

pub mod dispatcher;
pub mod error;
pub mod subscription;
pub mod topic_router;

pub use dispatcher::{DeliveryPool, MessageRouter};
pub use error::DeliveryError;
pub use subscription::{
	AsyncSubscription, SubscriptionItem, SubscriptionSink,
	subscription_channel,
};
pub use topic_router::TopicRouter;
