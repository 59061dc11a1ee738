//! Domain models for Warden.
//!
//! Principals and tenants belong to the surrounding platform; sessions,
//! audit events and blocked origins are owned here.

pub mod audit;
pub mod blocked_origin;
pub mod principal;
pub mod session;
pub mod tenant;
