//! Roseanne game backend library.
//!
//! Exposes the modules used by the `roseanne` binary and its integration tests.

pub mod api;
pub mod auth;
pub mod celebrity;
pub mod config;
pub mod db;
pub mod maintenance;
