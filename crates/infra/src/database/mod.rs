//! Database implementations

pub mod item_repository;
pub mod manager;
pub mod settings_repository;

pub use item_repository::*;
pub use manager::*;
pub use settings_repository::*;
