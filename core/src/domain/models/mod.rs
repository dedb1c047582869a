//! Domain model types for the family points core.
//!
//! These are the types the services operate on. They are distinct from the
//! DTOs in the `shared` crate, which exist for UI consumption; conversions
//! live on the models themselves.

pub mod identity;
pub mod ledger;
pub mod reward;
pub mod wallet;

pub use identity::*;
pub use ledger::*;
pub use reward::*;
pub use wallet::*;
