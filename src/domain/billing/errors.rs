//! Billing-specific error types.
//!
//! Errors related to subscription lifecycle, reconciliation, and access
//! control.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | CommunityNotFound | 404 |
//! | SubscriptionNotFound | 404 |
//! | NoActiveSubscription | 404 |
//! | Forbidden | 403 |
//! | SignatureVerificationFailed | 400 |
//! | TrialAlreadyUsed | 400 |
//! | InvalidState | 409 |
//! | Gateway | 502 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |
//!
//! Data faults (orphaned references, corrupt dates) are *not* errors: they
//! are recorded in analysis results and repaired by reconciliation.

use crate::domain::foundation::{DomainError, ErrorCode};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Community was not found by slug or id.
    CommunityNotFound(String),

    /// No subscription record matches the given gateway id (for this admin).
    SubscriptionNotFound(String),

    /// The community has no authoritative subscription to operate on.
    NoActiveSubscription(String),

    /// Caller is not the community admin.
    Forbidden { community: String },

    /// Payment signature verification failed.
    SignatureVerificationFailed,

    /// The admin trial was already used and cannot be repeated.
    TrialAlreadyUsed,

    /// Invalid state for the requested operation.
    InvalidState { current: String, attempted: String },

    /// An outbound gateway call failed; local state was left untouched.
    Gateway(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    // Constructor functions for cleaner error creation

    pub fn community_not_found(slug: impl Into<String>) -> Self {
        BillingError::CommunityNotFound(slug.into())
    }

    pub fn subscription_not_found(gateway_id: impl Into<String>) -> Self {
        BillingError::SubscriptionNotFound(gateway_id.into())
    }

    pub fn no_active_subscription(slug: impl Into<String>) -> Self {
        BillingError::NoActiveSubscription(slug.into())
    }

    pub fn forbidden(community: impl Into<String>) -> Self {
        BillingError::Forbidden {
            community: community.into(),
        }
    }

    pub fn signature_verification_failed() -> Self {
        BillingError::SignatureVerificationFailed
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        BillingError::Gateway(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::CommunityNotFound(_) => ErrorCode::CommunityNotFound,
            BillingError::SubscriptionNotFound(_) | BillingError::NoActiveSubscription(_) => {
                ErrorCode::SubscriptionNotFound
            }
            BillingError::Forbidden { .. } => ErrorCode::Forbidden,
            BillingError::SignatureVerificationFailed => ErrorCode::SignatureInvalid,
            BillingError::TrialAlreadyUsed => ErrorCode::TrialAlreadyUsed,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::Gateway(_) => ErrorCode::GatewayError,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::CommunityNotFound(slug) => format!("Community not found: {}", slug),
            BillingError::SubscriptionNotFound(id) => {
                format!("Subscription not found: {}", id)
            }
            BillingError::NoActiveSubscription(slug) => {
                format!("Community {} has no active subscription", slug)
            }
            BillingError::Forbidden { community } => {
                format!("Only the admin of {} may perform this operation", community)
            }
            BillingError::SignatureVerificationFailed => {
                "Payment signature verification failed".to_string()
            }
            BillingError::TrialAlreadyUsed => {
                "The trial has already been used and cannot be repeated".to_string()
            }
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} from state {}", attempted, current)
            }
            BillingError::Gateway(message) => format!("Gateway error: {}", message),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for {}: {}", field, message)
            }
            BillingError::Infrastructure(message) => message.clone(),
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Forbidden | ErrorCode::Unauthorized => BillingError::Forbidden {
                community: err
                    .details
                    .get("owner_id")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_map_to_not_found_codes() {
        assert_eq!(
            BillingError::community_not_found("makers").code(),
            ErrorCode::CommunityNotFound
        );
        assert_eq!(
            BillingError::subscription_not_found("sub_1").code(),
            ErrorCode::SubscriptionNotFound
        );
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = BillingError::forbidden("makers");
        let rendered = err.to_string();

        assert!(rendered.contains("FORBIDDEN"));
        assert!(rendered.contains("makers"));
    }

    #[test]
    fn forbidden_domain_error_converts_to_forbidden() {
        let domain = DomainError::new(ErrorCode::Forbidden, "nope")
            .with_detail("owner_id", "admin-1");
        let billing: BillingError = domain.into();

        assert_eq!(billing.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn other_domain_errors_convert_to_infrastructure() {
        let domain = DomainError::new(ErrorCode::DatabaseError, "connection lost");
        let billing: BillingError = domain.into();

        assert!(matches!(billing, BillingError::Infrastructure(_)));
    }
}
