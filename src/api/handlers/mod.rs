//! Route handlers for the SPID session service.

pub mod auth;
pub mod health;
