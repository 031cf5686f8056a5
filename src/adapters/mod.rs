//! Adapters - concrete implementations of the ports.
//!
//! The in-memory adapters back the integration tests and local
//! development wiring; the mock gateway stands in for the real payment
//! gateway with configurable behavior.

pub mod gateway;
pub mod memory;

pub use gateway::{MethodCall, MockGateway, SignatureMode};
pub use memory::{
    InMemoryCommunityStore, InMemorySubscriptionStore, InMemoryTransactionLog,
    RecordingNotificationSender, SentEmail,
};
