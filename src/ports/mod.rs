//! Ports - interfaces to external collaborators.
//!
//! The document store, the payment gateway, and the notification sender
//! are reached exclusively through these narrow traits. Adapters (real or
//! in-memory) live in `crate::adapters`.

mod community_store;
mod gateway_client;
mod notification_sender;
mod subscription_store;
mod transaction_log;

pub use community_store::CommunityStore;
pub use gateway_client::{
    CreateSubscriptionRequest, GatewayClient, GatewayError, GatewayErrorCode, GatewaySubscription,
    PaymentDetails,
};
pub use notification_sender::{EmailTemplate, NotificationSender};
pub use subscription_store::SubscriptionRecordStore;
pub use transaction_log::TransactionLog;
