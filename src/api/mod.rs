//! Upstream sports-data feed access.

pub mod client;
pub mod errors;
pub mod feed;
