//! Admin credential check gating the privileged editing mode.
//!
//! A candidate password is hashed as `SHA-256(password || salt)` and compared,
//! in constant time, against a stored digest.
//!
//! Trust model: the salt and the stored digest ship with every client, so a
//! visitor can run an offline guessing attack or simply flip the in-memory
//! flag. This gate keeps casual visitors out of the editor; it does not stop
//! a determined attacker, and the remote store must enforce its own write
//! rules.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::errors::{SyncError, SyncResult};

/// Salt of the compiled admin credential.
pub const ADMIN_SALT: &str = "4f7a1c9e2b";

/// Stored digest of the compiled admin credential.
pub const ADMIN_DIGEST: &str = "8dbdd28c01d52a8563d3aab9560f2f0f3eaa6b9536a2faed5d3054472e73623a";

/// Message shown after a failed login.
pub const LOGIN_FAILED: &str = "Wrong password";

/// Lowercase hex SHA-256 of `secret` followed by `salt`.
pub fn compute_digest(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Compare a computed digest with the stored one.
pub fn verify(candidate_digest: &str, stored_digest: &str) -> bool {
    constant_time_compare(candidate_digest, stored_digest)
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}

/// Salt and stored digest of the admin credential.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    salt: String,
    stored_digest: String,
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new(ADMIN_SALT, ADMIN_DIGEST)
    }
}

impl CredentialVerifier {
    pub fn new(salt: &str, stored_digest: &str) -> Self {
        Self {
            salt: salt.to_string(),
            stored_digest: stored_digest.trim().to_ascii_lowercase(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.admin_salt, &config.admin_digest)
    }

    /// Digest of a candidate password under this verifier's salt.
    pub fn digest(&self, password: &str) -> String {
        compute_digest(password, &self.salt)
    }

    /// Check a candidate password.
    pub fn check(&self, password: &str) -> bool {
        verify(&self.digest(password), &self.stored_digest)
    }
}

/// Privileged-mode state of one client session.
///
/// Nothing here is persisted; a new session always starts unprivileged.
#[derive(Debug, Default)]
pub struct AdminSession {
    verifier: CredentialVerifier,
    privileged: bool,
    last_error: Option<String>,
    diagnostic_digest: Option<String>,
}

impl AdminSession {
    pub fn new(verifier: CredentialVerifier) -> Self {
        Self {
            verifier,
            privileged: false,
            last_error: None,
            diagnostic_digest: None,
        }
    }

    /// Try to enter privileged mode. The password is wiped before returning.
    pub fn login(&mut self, password: String) -> bool {
        let password = Zeroizing::new(password);
        let digest = self.verifier.digest(&password);

        if verify(&digest, &self.verifier.stored_digest) {
            tracing::info!("Privileged editing mode enabled");
            self.privileged = true;
            self.last_error = None;
            self.diagnostic_digest = None;
            true
        } else {
            tracing::warn!("Admin login rejected");
            self.privileged = false;
            self.last_error = Some(LOGIN_FAILED.to_string());
            self.diagnostic_digest = Some(digest);
            false
        }
    }

    /// Leave privileged mode.
    pub fn logout(&mut self) {
        self.privileged = false;
        self.diagnostic_digest = None;
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Fails with a credential error unless privileged mode is on.
    pub fn require_privileged(&self) -> SyncResult<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(SyncError::Credential(
                "privileged editing mode required".into(),
            ))
        }
    }

    /// User-visible message of the last failed login.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Digest computed from the last failed attempt, for an operator who
    /// controls the stored digest and wants to update it. Never the stored
    /// digest itself, and never sent anywhere.
    pub fn reveal_diagnostic(&self) -> Option<&str> {
        self.diagnostic_digest.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_compute_digest_known_values() {
        assert_eq!(
            compute_digest("", ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            compute_digest("wrongpass", ADMIN_SALT),
            "a7793ab88accfd34fbd967bcb74f4cd6da39be00a07bb39fdff4812924516618"
        );
    }

    #[test]
    fn test_wrong_password_is_denied() {
        let mut session = AdminSession::default();
        let digest = compute_digest("wrongpass", "4f7a1c9e2b");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, ADMIN_DIGEST);

        assert!(!session.login("wrongpass".to_string()));
        assert!(!session.is_privileged());
        assert_eq!(session.last_error(), Some(LOGIN_FAILED));
        assert_eq!(session.reveal_diagnostic(), Some(digest.as_str()));
        assert!(session.require_privileged().is_err());
    }

    #[test]
    fn test_correct_password_grants_privileges() {
        let stored = compute_digest("hunter2", ADMIN_SALT);
        assert_eq!(
            stored,
            "8c4f0bbf38201711e359e3debd42c8272726acdcc7a98f2ffab147ff9b054c9d"
        );
        let mut session = AdminSession::new(CredentialVerifier::new(ADMIN_SALT, &stored));

        assert!(!session.login("hunter".to_string()));
        assert!(session.login("hunter2".to_string()));
        assert!(session.is_privileged());
        assert_eq!(session.last_error(), None);
        assert_eq!(session.reveal_diagnostic(), None);
        assert!(session.require_privileged().is_ok());

        session.logout();
        assert!(!session.is_privileged());
    }

    #[test]
    fn test_stored_digest_is_case_insensitive() {
        let stored = compute_digest("hunter2", ADMIN_SALT).to_uppercase();
        let verifier = CredentialVerifier::new(ADMIN_SALT, &stored);
        assert!(verifier.check("hunter2"));
    }
}
