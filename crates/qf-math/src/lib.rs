//! Deterministic integer arithmetic behind quadratic funding settlement.
//!
//! Everything here is pure and floating-point free: independent replays of
//! the same contribution log must agree on every payout to the base unit.

pub mod error;
pub mod isqrt;
pub mod quadratic;

pub use error::{MathError, Result};
pub use isqrt::{donation_weight, isqrt, WEIGHT_SCALE};
pub use quadratic::{match_amounts, match_share, quadratic_score, total_score};
