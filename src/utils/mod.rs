//! # Utility Modules
//!
//! Shared helpers that don't belong to a single component.

pub mod serde;
