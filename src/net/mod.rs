//! Networking modules for the remote authentication service.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` issues the two HTTP calls the session core depends on, and `types`
//! defines their wire schema.

pub mod api;
pub mod types;
