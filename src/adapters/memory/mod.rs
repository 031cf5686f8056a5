//! In-memory adapter implementations.

mod community_store;
mod notification;
mod subscription_store;
mod transaction_log;

pub use community_store::InMemoryCommunityStore;
pub use notification::{RecordingNotificationSender, SentEmail};
pub use subscription_store::InMemorySubscriptionStore;
pub use transaction_log::InMemoryTransactionLog;
