//! Infrastructure layer: in-memory stores, configuration, and the guarded
//! kitchen service that composes the domain crates.

pub mod config;
pub mod directory;
pub mod error;
pub mod kitchen_store;
pub mod service;

pub use config::{ConfigError, LarderConfig};
pub use directory::InMemoryDirectory;
pub use error::ServiceError;
pub use kitchen_store::InMemoryKitchenStore;
pub use service::{KitchenService, ReceiptIntake};
