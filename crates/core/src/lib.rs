//! # Teamline Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The sync orchestrator, token manager, item mapper, and webhook channel
//!   manager
//! - Port/adapter interfaces (traits) for persistence, the calendar
//!   provider, and client notification
//!
//! ## Architecture Principles
//! - Only depends on `teamline-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod calendar_ports;
pub mod mapper;
pub mod sync;
pub mod token;
pub mod webhook;

// Re-export specific items to avoid ambiguity
pub use calendar_ports::CalendarPort;
pub use sync::ports::{ChangeNotifier, ItemRepository, NoopNotifier, SettingsRepository};
pub use sync::{PullWindow, SyncEngine, SyncGate};
pub use token::TokenManager;
pub use webhook::ChannelManager;
