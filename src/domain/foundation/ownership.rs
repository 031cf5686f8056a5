//! Ownership trait for user-owned resources.
//!
//! Every billing operation in this crate is scoped to a community and its
//! admin. The `OwnedByUser` trait standardizes that check so handlers do
//! not each grow an ad-hoc `is_admin()` with its own error shape.
//!
//! # Example
//!
//! ```ignore
//! impl OwnedByUser for Community {
//!     fn owner_id(&self) -> &UserId {
//!         &self.admin_id
//!     }
//! }
//!
//! // In a handler:
//! community.check_ownership(&caller)?;  // Returns Err(Forbidden) if not admin
//! ```

use super::{DomainError, ErrorCode, UserId};

/// Trait for aggregates that have a single owner.
///
/// Implementors should return the `UserId` of the owning user.
/// The trait provides default implementations for ownership checking.
pub trait OwnedByUser {
    /// Returns the ID of the user who owns this resource.
    fn owner_id(&self) -> &UserId;

    /// Checks if the given user is the owner.
    fn is_owner(&self, user_id: &UserId) -> bool {
        self.owner_id() == user_id
    }

    /// Validates ownership, returning an error if the user is not the owner.
    ///
    /// This is the preferred method to use in command handlers as it
    /// returns a properly formed `DomainError` with `Forbidden` code.
    fn check_ownership(&self, user_id: &UserId) -> Result<(), DomainError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                "User does not own this resource",
            )
            .with_detail("owner_id", self.owner_id().to_string())
            .with_detail("requested_by", user_id.to_string()))
        }
    }
}
