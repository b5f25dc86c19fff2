//! Kickoff scheduling, cleanup sweeping, and the background job loops.

pub mod jobs;
pub mod queue;
pub mod sweeper;
