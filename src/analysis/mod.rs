//! Decision logic on top of the filtered tables: per-cell threshold flags and
//! the six-indicator strategy score.

pub mod scoring;
pub mod threshold;
