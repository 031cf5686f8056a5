//! Payment gateway client port.
//!
//! Defines the contract for the external payment gateway. Implementations
//! handle the actual API calls; this core only cares that a failed
//! outbound call leaves local state untouched.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface works with any subscription
//!   gateway that signs payment confirmations.
//! - **Idempotent**: cancel and verify operations can be safely retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment gateway integrations.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create a subscription at the gateway.
    ///
    /// Returns the gateway's view of the new subscription.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Cancel a subscription.
    ///
    /// If `at_cycle_end` is true, the subscription remains active until the
    /// current billing period ends.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_cycle_end: bool,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Verify a payment confirmation signature.
    ///
    /// Returns `Ok(true)` only when the signature matches the account's
    /// signing secret for this subscription/payment pair.
    async fn verify_signature(
        &self,
        subscription_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError>;

    /// Fetch details of a payment by gateway payment id.
    ///
    /// Returns `None` if the gateway does not know the payment.
    async fn fetch_payment_details(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentDetails>, GatewayError>;
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Gateway plan id to charge against.
    pub plan_id: String,

    /// Gateway customer id, when one already exists.
    pub customer_id: Option<String>,

    /// Total number of charges (0 = open-ended).
    pub total_count: u32,
}

/// A subscription as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySubscription {
    /// Gateway subscription id.
    pub id: String,

    /// Gateway plan id.
    pub plan_id: String,

    /// Gateway customer id, if assigned.
    pub customer_id: Option<String>,

    /// Raw gateway status string.
    pub status: String,

    /// Current period start (Unix seconds), when the gateway reports one.
    pub current_start: Option<i64>,

    /// Current period end (Unix seconds), when the gateway reports one.
    pub current_end: Option<i64>,

    /// Total number of planned charges.
    pub total_count: u32,
}

/// Details of a payment as the gateway reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Gateway payment id.
    pub id: String,

    /// Amount in minor units (cents).
    pub amount_minor: i64,

    /// ISO currency code.
    pub currency: String,

    /// Raw gateway payment status string.
    pub status: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Gateway's own error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the gateway's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found at the gateway.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Gateway API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl From<GatewayError> for crate::domain::billing::BillingError {
    fn from(err: GatewayError) -> Self {
        crate::domain::billing::BillingError::gateway(err.to_string())
    }
}
