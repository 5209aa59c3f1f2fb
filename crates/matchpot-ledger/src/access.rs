//! Identity and role collaborators.
//!
//! Credential verification is an external capability; the core only needs
//! "credential in, stable [`UserId`] out" and "is this user an admin".

use std::collections::{HashMap, HashSet};

use matchpot_types::{LedgerConfig, LedgerError, Result, UserId};

/// Verifies an opaque credential and yields the caller's identity.
pub trait IdentityVerifier: Send + Sync {
    /// # Errors
    /// Returns [`LedgerError::Unauthorized`] if the credential is missing or invalid.
    fn verify(&self, credential: &str) -> Result<UserId>;
}

/// Answers whether an identity holds the admin capability.
pub trait RoleLookup: Send + Sync {
    fn is_admin(&self, user_id: &UserId) -> bool;
}

/// Fail with `Forbidden` unless `user_id` is an admin.
pub fn require_admin(roles: &dyn RoleLookup, user_id: UserId) -> Result<()> {
    if roles.is_admin(&user_id) {
        Ok(())
    } else {
        tracing::warn!(user = %user_id, "Admin operation refused");
        Err(LedgerError::Forbidden(user_id))
    }
}

/// Fixed admin set, typically built from [`LedgerConfig::admins`].
#[derive(Debug, Clone, Default)]
pub struct StaticRoles {
    admins: HashSet<UserId>,
}

impl StaticRoles {
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.admins.iter().copied())
    }
}

impl RoleLookup for StaticRoles {
    fn is_admin(&self, user_id: &UserId) -> bool {
        self.admins.contains(user_id)
    }
}

/// Table-driven verifier mapping bearer tokens to users.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as a credential for `user_id`.
    pub fn register(&mut self, token: impl Into<String>, user_id: UserId) {
        self.tokens.insert(token.into(), user_id);
    }
}

impl IdentityVerifier for StaticTokenVerifier {
    fn verify(&self, credential: &str) -> Result<UserId> {
        let token = credential
            .strip_prefix("Bearer ")
            .unwrap_or(credential)
            .trim();
        if token.is_empty() {
            return Err(LedgerError::unauthorized("missing credential"));
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| LedgerError::unauthorized("invalid credential"))
    }
}
