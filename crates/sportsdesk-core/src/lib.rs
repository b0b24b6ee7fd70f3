pub mod config;
pub mod error;
pub mod firebase;
pub mod identity;
pub mod memory;
pub mod records;
pub mod store;

pub use config::{
    DatabaseBackend, DatabaseConfig, FirebaseConfig, IdentityBackend, IdentityConfig,
    LoggingConfig, SecretsConfig, ServerConfig, Settings, StaticToken,
};
pub use error::*;
pub use identity::*;
pub use memory::{MemoryStore, StaticTokenVerifier};
pub use records::*;
pub use store::*;
