//! Child credential verification.
//!
//! Verification is exactly one round trip to the remote procedure. There is
//! no local comparison, no retry, and the clear-text secret exists only for
//! the duration of the call; it is never logged and never touches a session
//! tier. A mismatch is a normal result the caller re-prompts on.

use anyhow::Result;
use log::{info, warn};
use shared::VerifyMode;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::commands::secret::{VerifySecretCommand, VerifySecretResult};
use crate::store::traits::RemoteStore;

/// How long to wait for the verification procedure before giving up.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const PIN_MIN_DIGITS: usize = 4;
const PIN_MAX_DIGITS: usize = 12;

#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn RemoteStore>,
    timeout: Duration,
}

impl SecretService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_timeout(store, VERIFY_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn RemoteStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Verify a child-entered credential.
    ///
    /// `Ok` with `verified: false` is a mismatch or a rejected PIN format;
    /// `Err` means the verification endpoint itself was unreachable or timed
    /// out, which the UI should present as "try again", not "wrong PIN".
    pub async fn verify(&self, command: VerifySecretCommand) -> Result<VerifySecretResult> {
        if command.mode == VerifyMode::Pin && !is_valid_pin(&command.secret) {
            return Ok(VerifySecretResult {
                verified: false,
                message: format!(
                    "PIN must be {} to {} digits.",
                    PIN_MIN_DIGITS, PIN_MAX_DIGITS
                ),
            });
        }

        info!(
            "Verifying {:?} for child {} (input length {})",
            command.mode,
            command.child_ref,
            command.secret.len()
        );

        let call = self
            .store
            .verify_secret(&command.child_ref, &command.secret, command.mode);

        let verified = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(e)) => {
                warn!("Verification call failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                warn!("Verification call timed out after {:?}", self.timeout);
                anyhow::bail!("Verification service did not answer");
            }
        };

        let result = if verified {
            info!("Verification succeeded for child {}", command.child_ref);
            VerifySecretResult {
                verified: true,
                message: "Welcome back!".to_string(),
            }
        } else {
            info!("Verification failed for child {}", command.child_ref);
            VerifySecretResult {
                verified: false,
                message: "That didn't match. Try again.".to_string(),
            }
        };

        Ok(result)
    }
}

fn is_valid_pin(secret: &str) -> bool {
    (PIN_MIN_DIGITS..=PIN_MAX_DIGITS).contains(&secret.len())
        && secret.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::sync::atomic::Ordering;

    fn setup() -> (SecretService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = SecretService::new(store.clone());
        (service, store)
    }

    fn command(secret: &str, mode: VerifyMode) -> VerifySecretCommand {
        VerifySecretCommand {
            child_ref: "c-1".to_string(),
            secret: secret.to_string(),
            mode,
        }
    }

    #[tokio::test]
    async fn correct_pin_verifies() {
        let (service, store) = setup();
        store.set_secret("c-1", "4321");

        let result = service.verify(command("4321", VerifyMode::Pin)).await.unwrap();
        assert!(result.verified);
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_pin_is_a_result_not_an_error() {
        let (service, store) = setup();
        store.set_secret("c-1", "4321");

        let result = service.verify(command("9999", VerifyMode::Pin)).await.unwrap();
        assert!(!result.verified);
        // One round trip per attempt, no retry
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_pin_never_reaches_the_endpoint() {
        let (service, store) = setup();
        store.set_secret("c-1", "4321");

        for bad in ["123", "1234567890123", "12a4", ""] {
            let result = service.verify(command(bad, VerifyMode::Pin)).await.unwrap();
            assert!(!result.verified, "{:?} should be rejected locally", bad);
        }
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn password_mode_has_no_format_constraint() {
        let (service, store) = setup();
        store.set_secret("c-1", "tiny");

        let result = service
            .verify(command("tiny", VerifyMode::Password))
            .await
            .unwrap();
        assert!(result.verified);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_endpoint_times_out_as_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.hang_verify.store(true, Ordering::SeqCst);
        let service = SecretService::with_timeout(store.clone(), Duration::from_secs(1));

        let outcome = service.verify(command("4321", VerifyMode::Pin)).await;
        assert!(outcome.is_err());
        // The call never completed, so no round trip was recorded
        assert_eq!(store.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pin_format_bounds() {
        assert!(is_valid_pin("1234"));
        assert!(is_valid_pin("123456789012"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("1234567890123"));
        assert!(!is_valid_pin("12 34"));
    }
}
