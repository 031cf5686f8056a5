//! Foundation types shared across the billing domain.
//!
//! Value objects (ids, timestamps), the state machine trait for status
//! enums, the ownership trait used for admin authorization, and the
//! common error types.

mod errors;
mod ids;
mod ownership;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CommunityId, CommunitySlug, TransactionId, UserId};
pub use ownership::OwnedByUser;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
