//! Domain types and models

pub mod item;
pub mod provider;
pub mod report;
pub mod settings;

pub use item::{ExternalRef, ItemCategory, ItemKind, Participants, SyncItem, TimeWindow};
pub use provider::{EventTime, ProviderEvent, TokenRefresh};
pub use report::{CleanupReport, ItemFailure, SyncReport};
pub use settings::{CategoryToggles, ResourceState, SyncDirection, SyncSettings, WebhookChannel};
