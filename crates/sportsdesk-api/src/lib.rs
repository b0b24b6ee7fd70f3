pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::AuthContext;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
