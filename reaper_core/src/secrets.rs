//! Per-application authentication secrets.

use crate::error::{Error, Result};
use crate::interner::AppIdentity;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;

/// Opaque token identifying an application to the transfer protocol.
///
/// Zero is reserved and never issued.
pub type AppSecret = u64;

/// Bidirectional map between applications and their secrets.
#[derive(Debug, Default)]
pub struct SecretRegistry {
    by_app: HashMap<AppIdentity, AppSecret>,
    by_secret: HashMap<AppSecret, AppIdentity>,
}

impl SecretRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the secret for `app`, issuing one on first request.
    pub fn get_or_issue(&mut self, app: &AppIdentity) -> AppSecret {
        if let Some(&secret) = self.by_app.get(app) {
            return secret;
        }

        let secret = self.fresh_secret();
        self.by_app.insert(app.clone(), secret);
        self.by_secret.insert(secret, app.clone());
        tracing::debug!(app = %app, "issued application secret");
        secret
    }

    /// Resolve a secret back to the application it was issued to.
    pub fn resolve(&self, secret: AppSecret) -> Result<AppIdentity> {
        self.by_secret
            .get(&secret)
            .cloned()
            .ok_or_else(|| Error::secret_not_found(secret))
    }

    /// Number of applications holding a secret.
    pub fn len(&self) -> usize {
        self.by_app.len()
    }

    /// Whether no secret has been issued.
    pub fn is_empty(&self) -> bool {
        self.by_app.is_empty()
    }

    /// Forget every issued secret.
    pub fn clear(&mut self) {
        self.by_app.clear();
        self.by_secret.clear();
    }

    /// Draw a nonzero secret not already issued to another app.
    fn fresh_secret(&self) -> AppSecret {
        loop {
            let candidate = OsRng.next_u64();
            if candidate != 0 && !self.by_secret.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
