use crate::error::{MathError, Result};

/// Quadratic score of a proposal: the square of its accumulated weight.
pub fn quadratic_score(weight: u64) -> u128 {
    let w = weight as u128;
    w * w
}

/// Sum of quadratic scores across a round's proposals.
pub fn total_score(weights: &[u64]) -> Result<u128> {
    let mut total: u128 = 0;
    for &w in weights {
        total = total
            .checked_add(quadratic_score(w))
            .ok_or(MathError::Overflow)?;
    }
    Ok(total)
}

/// One proposal's share of the matching pool:
/// `floor(score * pool / total_score)`.
///
/// Multiplication first, division last, all in u128, so no precision is
/// lost before the single final floor. A round with no donations has
/// `total_score == 0` and every share is zero.
pub fn match_share(score: u128, total_score: u128, pool: u64) -> Result<u64> {
    if total_score == 0 || score == 0 {
        return Ok(0);
    }

    let numerator = score
        .checked_mul(pool as u128)
        .ok_or(MathError::Overflow)?;
    let share = numerator / total_score;

    // score <= total_score, so the share is bounded by the pool.
    u64::try_from(share).map_err(|_| MathError::Overflow)
}

/// Match amounts for a full round, in the same order as `weights`.
pub fn match_amounts(weights: &[u64], pool: u64) -> Result<Vec<u64>> {
    let total = total_score(weights)?;
    weights
        .iter()
        .map(|&w| match_share(quadratic_score(w), total, pool))
        .collect()
}
