//! # Store Module
//!
//! Everything that talks to a storage surface: the trait definitions the
//! domain layer depends on, the REST backend for the hosted deployment, the
//! in-memory backend for development and tests, and the two session tiers.

pub mod memory;
pub mod rest;
pub mod session;
pub mod traits;

pub use traits::*;
