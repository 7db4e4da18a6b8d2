//! # Teamline Domain
//!
//! Business domain types and models for Teamline calendar sync.
//!
//! This crate contains:
//! - Domain data types (SyncItem, SyncSettings, ProviderEvent, ...)
//! - Domain error types and Result definitions
//! - Domain constants (provenance markers, lifecycle windows)
//!
//! ## Architecture
//! - No dependencies on other Teamline crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
