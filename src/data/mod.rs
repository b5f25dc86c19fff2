//! Domain models, timestamp parsing, and the client-side match clock.

pub mod match_clock;
pub mod models;
pub mod time_parse;
