//! REST store backend.
//!
//! Speaks the hosted deployment's PostgREST-style surface: table reads with
//! filter predicates and stored procedures under `/rest/v1/rpc/`.

mod client;
mod error;

pub use client::{RestStore, StoreConfig};
pub use error::StoreError;
