//! Majority voting over independent agent responses.
//!
//! Answers are reduced to a comparable token, tallied case-insensitively,
//! and the plurality winner is returned with a confidence score.

pub mod majority;

pub use majority::compute_majority;
