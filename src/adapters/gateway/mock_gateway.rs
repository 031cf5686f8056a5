//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `GatewayClient` for unit and
//! integration tests. Supports:
//! - Pre-configured subscriptions and payments
//! - Error injection (global or per-method)
//! - Call tracking
//! - Pluggable signature verification behavior

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::PaymentSignatureVerifier;
use crate::ports::{
    CreateSubscriptionRequest, GatewayClient, GatewayError, GatewaySubscription, PaymentDetails,
};

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// How the mock handles signature verification.
#[derive(Default, Clone)]
pub enum SignatureMode {
    /// Accept any signature.
    #[default]
    AcceptAll,

    /// Reject every signature.
    AlwaysFail,

    /// Verify for real against a signing secret.
    Hmac(PaymentSignatureVerifier),
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Pre-configured subscriptions by id.
    subscriptions: HashMap<String, GatewaySubscription>,

    /// Pre-configured payments by id.
    payments: HashMap<String, PaymentDetails>,

    /// Error to return on the next call, whatever it is.
    next_error: Option<GatewayError>,

    /// Errors keyed by method name.
    method_errors: HashMap<String, GatewayError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Signature verification behavior.
    signature_mode: SignatureMode,

    /// Counter for synthesized subscription ids.
    created: u32,
}

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockGateway::new();
/// gateway.set_payment(PaymentDetails { id: "pay_1".into(), ... });
/// gateway.fail_method("cancel_subscription", GatewayError::network("down"));
///
/// let result = gateway.cancel_subscription("sub_1", true).await;
/// assert!(result.is_err());
/// assert_eq!(gateway.call_count("cancel_subscription"), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockGateway {
    inner: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-configure a subscription the mock knows about.
    pub fn set_subscription(&self, subscription: GatewaySubscription) {
        let mut state = self.inner.lock().unwrap();
        state.subscriptions.insert(subscription.id.clone(), subscription);
    }

    /// Pre-configure a payment the mock knows about.
    pub fn set_payment(&self, payment: PaymentDetails) {
        let mut state = self.inner.lock().unwrap();
        state.payments.insert(payment.id.clone(), payment);
    }

    /// Fail the next call, whichever method it hits.
    pub fn fail_next(&self, error: GatewayError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Fail every call to the named method.
    pub fn fail_method(&self, method: &str, error: GatewayError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Reject all signatures.
    pub fn reject_signatures(&self) {
        self.inner.lock().unwrap().signature_mode = SignatureMode::AlwaysFail;
    }

    /// Verify signatures for real with the given verifier.
    pub fn verify_with(&self, verifier: PaymentSignatureVerifier) {
        self.inner.lock().unwrap().signature_mode = SignatureMode::Hmac(verifier);
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Returns how many times the named method was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record_call(state: &mut MockState, method: &str, args: Vec<String>) {
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn take_error(state: &mut MockState, method: &str) -> Option<GatewayError> {
        if let Some(err) = state.method_errors.get(method) {
            return Some(err.clone());
        }
        state.next_error.take()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        Self::record_call(
            &mut state,
            "create_subscription",
            vec![request.plan_id.clone()],
        );
        if let Some(err) = Self::take_error(&mut state, "create_subscription") {
            return Err(err);
        }

        state.created += 1;
        let subscription = GatewaySubscription {
            id: format!("sub_mock_{:03}", state.created),
            plan_id: request.plan_id,
            customer_id: request.customer_id,
            status: "created".to_string(),
            current_start: None,
            current_end: None,
            total_count: request.total_count,
        };
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_cycle_end: bool,
    ) -> Result<GatewaySubscription, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        Self::record_call(
            &mut state,
            "cancel_subscription",
            vec![subscription_id.to_string(), at_cycle_end.to_string()],
        );
        if let Some(err) = Self::take_error(&mut state, "cancel_subscription") {
            return Err(err);
        }

        match state.subscriptions.get_mut(subscription_id) {
            Some(subscription) => {
                subscription.status = "cancelled".to_string();
                Ok(subscription.clone())
            }
            None => {
                // Cancelling an unknown id still succeeds from the caller's
                // point of view in most gateways' sandbox; synthesize it.
                let subscription = GatewaySubscription {
                    id: subscription_id.to_string(),
                    plan_id: String::new(),
                    customer_id: None,
                    status: "cancelled".to_string(),
                    current_start: None,
                    current_end: None,
                    total_count: 0,
                };
                state
                    .subscriptions
                    .insert(subscription_id.to_string(), subscription.clone());
                Ok(subscription)
            }
        }
    }

    async fn verify_signature(
        &self,
        subscription_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        Self::record_call(
            &mut state,
            "verify_signature",
            vec![subscription_id.to_string(), payment_id.to_string()],
        );
        if let Some(err) = Self::take_error(&mut state, "verify_signature") {
            return Err(err);
        }

        let verified = match &state.signature_mode {
            SignatureMode::AcceptAll => true,
            SignatureMode::AlwaysFail => false,
            SignatureMode::Hmac(verifier) => {
                verifier.verify(subscription_id, payment_id, signature)
            }
        };
        Ok(verified)
    }

    async fn fetch_payment_details(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentDetails>, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        Self::record_call(
            &mut state,
            "fetch_payment_details",
            vec![payment_id.to_string()],
        );
        if let Some(err) = Self::take_error(&mut state, "fetch_payment_details") {
            return Err(err);
        }

        Ok(state.payments.get(payment_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_subscription_synthesizes_ids() {
        let gateway = MockGateway::new();
        let request = CreateSubscriptionRequest {
            plan_id: "plan_monthly".to_string(),
            customer_id: None,
            total_count: 12,
        };

        let first = gateway.create_subscription(request.clone()).await.unwrap();
        let second = gateway.create_subscription(request).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, "created");
    }

    #[tokio::test]
    async fn cancel_marks_subscription_cancelled() {
        let gateway = MockGateway::new();
        let request = CreateSubscriptionRequest {
            plan_id: "plan_monthly".to_string(),
            customer_id: None,
            total_count: 12,
        };
        let created = gateway.create_subscription(request).await.unwrap();

        let cancelled = gateway.cancel_subscription(&created.id, true).await.unwrap();

        assert_eq!(cancelled.status, "cancelled");
    }

    #[tokio::test]
    async fn method_error_injection_fails_only_that_method() {
        let gateway = MockGateway::new();
        gateway.fail_method("cancel_subscription", GatewayError::network("down"));

        assert!(gateway.cancel_subscription("sub_1", false).await.is_err());
        assert!(gateway.fetch_payment_details("pay_1").await.is_ok());
    }

    #[tokio::test]
    async fn signature_modes_control_verification() {
        let gateway = MockGateway::new();
        assert!(gateway
            .verify_signature("sub_1", "pay_1", "anything")
            .await
            .unwrap());

        gateway.reject_signatures();
        assert!(!gateway
            .verify_signature("sub_1", "pay_1", "anything")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let gateway = MockGateway::new();
        let _ = gateway.fetch_payment_details("pay_1").await;
        let _ = gateway.fetch_payment_details("pay_2").await;

        assert_eq!(gateway.call_count("fetch_payment_details"), 2);
        assert_eq!(gateway.calls()[0].args, vec!["pay_1".to_string()]);
    }
}
