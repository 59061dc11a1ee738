//! Warden Server: HTTP surface for the admin trust subsystem.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

pub use config::ServerConfig;
pub use routes::{AppState, router};
