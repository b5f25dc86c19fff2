//! Odds classification into display categories.

pub mod classifier;
