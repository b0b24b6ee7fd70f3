//! Firebase backends: Realtime Database reads and ID token verification.

pub mod auth;
pub mod credentials;
pub mod database;
#[cfg(test)]
pub(crate) mod test_support;

pub use auth::FirebaseTokenVerifier;
pub use credentials::{AccessTokenSource, ServiceAccountKey};
pub use database::FirebaseDatabase;
