//! Identity verification seam
//!
//! Credential issuance lives outside this crate; actions arrive with an
//! opaque token that a [`TokenVerifier`] turns into a verified
//! [`Identity`]. [`MemoryTokenVault`] is the bundled implementation,
//! issuing random session tokens against an in-memory table.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// A verified player identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

pub trait TokenVerifier: Send + Sync {
    /// Resolve a token to the identity it was issued for.
    fn verify(&self, token: &str) -> Result<Identity>;
}

/// In-memory token issuer and verifier.
#[derive(Debug, Default)]
pub struct MemoryTokenVault {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl MemoryTokenVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh opaque token for an identity.
    pub fn issue(&self, identity: Identity) -> String {
        use rand::Rng;
        use rand::distributions::Alphanumeric;
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.clone(), identity);
        }
        token
    }

    /// Invalidate a previously issued token.
    pub fn revoke(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.remove(token);
        }
    }
}

impl TokenVerifier for MemoryTokenVault {
    fn verify(&self, token: &str) -> Result<Identity> {
        self.tokens
            .read()
            .ok()
            .and_then(|tokens| tokens.get(token).cloned())
            .ok_or_else(|| EngineError::Unauthorized("invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let vault = MemoryTokenVault::new();
        let identity = Identity::new("u1", "alice");
        let token = vault.issue(identity.clone());
        assert_eq!(vault.verify(&token).unwrap(), identity);
    }

    #[test]
    fn unknown_and_revoked_tokens_are_unauthorized() {
        let vault = MemoryTokenVault::new();
        assert!(matches!(
            vault.verify("nope"),
            Err(EngineError::Unauthorized(_))
        ));

        let token = vault.issue(Identity::new("u1", "alice"));
        vault.revoke(&token);
        assert!(matches!(
            vault.verify(&token),
            Err(EngineError::Unauthorized(_))
        ));
    }

    #[test]
    fn tokens_are_distinct_per_issue() {
        let vault = MemoryTokenVault::new();
        let a = vault.issue(Identity::new("u1", "alice"));
        let b = vault.issue(Identity::new("u1", "alice"));
        assert_ne!(a, b);
    }
}
