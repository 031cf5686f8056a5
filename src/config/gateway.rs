//! Payment gateway configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway API key id.
    pub key_id: String,

    /// Gateway API key secret.
    pub key_secret: SecretString,

    /// Signing secret used to verify payment confirmation signatures.
    pub signing_secret: SecretString,
}

impl GatewayConfig {
    /// Check if using the gateway's test environment.
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("test_")
    }

    /// Check if using the gateway's live environment.
    pub fn is_live_mode(&self) -> bool {
        self.key_id.starts_with("live_")
    }

    /// Validate gateway configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key_id.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_KEY_ID"));
        }
        if self.key_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_KEY_SECRET"));
        }
        if self.signing_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_SIGNING_SECRET"));
        }

        // Key ids carry their environment as a prefix; anything else is a
        // paste error.
        if !self.is_test_mode() && !self.is_live_mode() {
            return Err(ValidationError::InvalidGatewayKeyId);
        }

        Ok(())
    }
}
