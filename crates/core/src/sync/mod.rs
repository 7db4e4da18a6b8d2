//! Sync engine and its port interfaces

pub mod engine;
pub mod gate;
pub mod ports;

pub use engine::{PullWindow, SyncEngine};
pub use gate::SyncGate;
pub use ports::{ChangeNotifier, ItemRepository, NoopNotifier, SettingsRepository};
