pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, ConfigError, StorageBackend};
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, WimoServer, build_app, create_persistence};
