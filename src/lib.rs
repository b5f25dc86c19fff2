//! Library entrypoint for livematch-core.
//!
//! Exposes all modules so integration tests can import them.

pub mod api;
pub mod cache;
pub mod config;
pub mod data;
pub mod odds;
pub mod schedule;
pub mod service;
