//! Service health evaluation.
//!
//! The verdict depends only on the fault controller's health flag; the
//! process snapshot attached to a healthy verdict is informational.

mod evaluator;

pub use evaluator::{HealthEvaluator, HealthVerdict};
