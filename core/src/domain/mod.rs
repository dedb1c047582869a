//! # Domain Module
//!
//! Business logic for child identity resolution and points-wallet
//! reconciliation.
//!
//! ## Module Organization
//!
//! - **identity_service**: family and child resolution from weak hints
//! - **session_service**: two-tier identity persistence and repair
//! - **secret_service**: remote credential verification
//! - **ledger_service**: two-source ledger aggregation and dedup
//! - **wallet_service**: precomputed-or-derived wallet reconciliation
//! - **reward_service**: reward/offer status classification
//! - **encouragement**: the cheer/bonus reason matcher
//! - **models**: domain types shared across the services
//! - **commands**: command/result structs crossing the service boundary
//!
//! Services hold `Arc` handles to the store traits and are cheap to clone.
//! Remote failures are absorbed at each service boundary: a source that
//! cannot answer behaves as empty, and only verification surfaces errors to
//! the user.

pub mod commands;
pub mod encouragement;
pub mod identity_service;
pub mod ledger_service;
pub mod models;
pub mod reward_service;
pub mod secret_service;
pub mod session_service;
pub mod wallet_service;

pub use identity_service::IdentityService;
pub use ledger_service::LedgerService;
pub use reward_service::RewardService;
pub use secret_service::SecretService;
pub use session_service::SessionService;
pub use wallet_service::{WalletComputation, WalletService};

/// Unwrap a store query, degrading a failed source to an empty result.
pub(crate) fn rows_or_empty<T>(result: anyhow::Result<Vec<T>>, source: &str) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Source {} unavailable, treating as empty: {}", source, e);
            Vec::new()
        }
    }
}
