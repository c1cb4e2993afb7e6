//! Identity provider boundary.
//!
//! The engine only consumes two answers from the identity provider: whether
//! a token is valid, and which user it belongs to. `TokenIdentityProvider`
//! answers both from SHA-256 token hashes held in configuration, so no
//! plaintext tokens are stored.

use crate::config::AuthConfig;
use laundry_core::cost::{units, CostAccountant, CostMeter};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Consumer name the boundary charges cost under.
pub const CONSUMER: &str = "IdentityProvider";

/// Token validation and identification.
pub trait IdentityProvider: Send + Sync {
    /// Returns whether `token` is valid.
    fn validate_token(&self, token: &str) -> bool;

    /// Returns the user ID for `token`.
    fn user_id(&self, token: &str) -> String;
}

/// Validates bearer tokens against pre-configured hashes.
#[derive(Debug, Clone)]
pub struct TokenIdentityProvider {
    /// Set of valid token hashes (SHA-256 hex strings).
    valid_hashes: HashSet<String>,
}

impl TokenIdentityProvider {
    /// Creates a provider accepting tokens with the given hashes.
    pub fn new(hashes: impl IntoIterator<Item = String>) -> Self {
        Self {
            valid_hashes: hashes
                .into_iter()
                .map(|h| h.trim().to_lowercase())
                .collect(),
        }
    }

    /// Creates a provider from the auth section of the config.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.token_hashes.clone())
    }

    /// Creates a provider accepting exactly the given plaintext tokens.
    pub fn with_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(tokens.into_iter().map(Self::hash_token))
    }

    /// Returns whether any tokens are configured.
    pub fn has_tokens(&self) -> bool {
        !self.valid_hashes.is_empty()
    }

    /// Returns the number of configured tokens.
    pub fn token_count(&self) -> usize {
        self.valid_hashes.len()
    }

    /// Hashes a token using SHA-256, returning a lowercase hex string.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl IdentityProvider for TokenIdentityProvider {
    fn validate_token(&self, token: &str) -> bool {
        if self.valid_hashes.is_empty() {
            return false;
        }
        self.valid_hashes.contains(&Self::hash_token(token))
    }

    /// The token hash doubles as an opaque user ID; invalid tokens map to "".
    fn user_id(&self, token: &str) -> String {
        let hash = Self::hash_token(token);
        if self.valid_hashes.contains(&hash) {
            hash
        } else {
            String::new()
        }
    }
}

/// Charged access to an identity provider.
pub struct IdentityBoundary {
    provider: Arc<dyn IdentityProvider>,
    meter: CostMeter,
}

impl IdentityBoundary {
    /// Connects to `provider`.
    pub fn new(provider: Arc<dyn IdentityProvider>, accountant: Arc<CostAccountant>) -> Self {
        let meter = CostMeter::new(accountant, CONSUMER);
        meter.charge(units::CONNECTION);
        Self { provider, meter }
    }

    /// Returns whether `token` is valid.
    pub fn validate_token(&self, token: &str) -> bool {
        self.meter.charge(units::EXTERNAL_API_CALL);
        self.provider.validate_token(token)
    }

    /// Returns the user ID for `token`.
    pub fn identify(&self, token: &str) -> String {
        self.meter.charge(units::EXTERNAL_API_CALL);
        self.provider.user_id(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token() {
        let hash = TokenIdentityProvider::hash_token("test-token");
        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, TokenIdentityProvider::hash_token("test-token"));
        assert_ne!(hash, TokenIdentityProvider::hash_token("other-token"));
    }

    #[test]
    fn test_validate_correct_token() {
        let provider = TokenIdentityProvider::with_tokens(["my-secret-token"]);
        assert!(provider.validate_token("my-secret-token"));
        assert!(!provider.validate_token("wrong-token"));
    }

    #[test]
    fn test_no_tokens_configured() {
        let provider = TokenIdentityProvider::new(Vec::<String>::new());
        assert!(!provider.has_tokens());
        assert!(!provider.validate_token("any-token"));
        assert!(!provider.validate_token(""));
    }

    #[test]
    fn test_uppercase_hashes_accepted() {
        let hash = TokenIdentityProvider::hash_token("MyToken").to_uppercase();
        let provider = TokenIdentityProvider::new(vec![hash]);
        assert!(provider.validate_token("MyToken"));
        assert!(!provider.validate_token("mytoken"));
    }

    #[test]
    fn test_multiple_tokens() {
        let provider = TokenIdentityProvider::with_tokens(["token-one", "token-two"]);
        assert_eq!(provider.token_count(), 2);
        assert!(provider.validate_token("token-one"));
        assert!(provider.validate_token("token-two"));
        assert!(!provider.validate_token("token-three"));
    }

    #[test]
    fn test_user_id() {
        let provider = TokenIdentityProvider::with_tokens(["alice"]);
        assert_eq!(
            provider.user_id("alice"),
            TokenIdentityProvider::hash_token("alice")
        );
        assert_eq!(provider.user_id("mallory"), "");
    }

    #[test]
    fn test_boundary_charges_external_calls() {
        let accountant = Arc::new(CostAccountant::new());
        let boundary = IdentityBoundary::new(
            Arc::new(TokenIdentityProvider::with_tokens(["alice"])),
            accountant.clone(),
        );
        assert_eq!(accountant.usage_of(CONSUMER), units::CONNECTION);

        assert!(boundary.validate_token("alice"));
        assert!(!boundary.validate_token("bob"));
        assert!(!boundary.identify("alice").is_empty());

        assert_eq!(
            accountant.usage_of(CONSUMER),
            units::CONNECTION + 3 * units::EXTERNAL_API_CALL
        );
    }
}
