//! Payment signature verification.
//!
//! The gateway signs successful payment confirmations with HMAC-SHA256 over
//! `"{payment_id}|{subscription_id}"` using the account's signing secret.
//! Verification uses constant-time comparison to avoid leaking signature
//! bytes through timing.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Verifier for gateway payment signatures.
#[derive(Clone)]
pub struct PaymentSignatureVerifier {
    /// The account signing secret from the gateway dashboard.
    secret: SecretString,
}

impl PaymentSignatureVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies a hex-encoded signature for a payment confirmation.
    ///
    /// Returns false for malformed hex as well as for a signature that
    /// does not match; the caller treats both identically (the activation
    /// attempt fails whole).
    pub fn verify(
        &self,
        gateway_subscription_id: &str,
        gateway_payment_id: &str,
        signature_hex: &str,
    ) -> bool {
        let provided = match hex::decode(signature_hex) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let expected = self.compute(gateway_subscription_id, gateway_payment_id);
        constant_time_compare(&expected, &provided)
    }

    /// Computes the HMAC-SHA256 signature bytes.
    fn compute(&self, gateway_subscription_id: &str, gateway_payment_id: &str) -> Vec<u8> {
        let signed_payload = format!("{}|{}", gateway_payment_id, gateway_subscription_id);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, subscription_id: &str, payment_id: &str) -> String {
    let signed_payload = format!("{}|{}", payment_id, subscription_id);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
