//! Warden Core: domain models, error taxonomy and repository traits
//! for the administrative trust and audit subsystem.

pub mod error;
pub mod models;
pub mod repository;
pub mod user_agent;

pub use error::{Rejection, WardenError, WardenResult};
