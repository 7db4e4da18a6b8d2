//! # Teamline Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite persistence for settings and items
//! - The Google Calendar v3 adapter
//! - The webhook receiving endpoint (axum)
//! - The cron-based sync scheduler
//!
//! ## Architecture
//! - Implements traits defined in `teamline-core`
//! - Depends on `teamline-domain` and `teamline-core`
//! - Contains all "impure" code (database, HTTP, clock-driven jobs)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod scheduling;
pub mod telemetry;
pub mod webhook_endpoint;

pub use config::InfraConfig;
pub use database::{DbManager, SqliteItemRepository, SqliteSettingsRepository};
pub use errors::InfraError;
pub use integrations::GoogleCalendarClient;
pub use scheduling::{SyncScheduler, SyncSchedulerConfig};
