//! Middleware module
//!
//! Contains Tower middleware for gateway API-key authentication.

pub mod auth;
