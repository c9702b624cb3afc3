/// Fixed-point scale applied to donation amounts before taking the square
/// root. Three decimal digits of sqrt precision: isqrt(10 * 10^6) = 3162,
/// read as 3.162 in whole units.
pub const WEIGHT_SCALE: u128 = 1_000_000;

/// Floor integer square root: the largest `r` with `r * r <= n`.
///
/// Newton's method on `u128`, starting from a power of two at least as
/// large as the true root so the iteration descends monotonically. Integer
/// only, so independent re-executions agree bit for bit.
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);

    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Quadratic weight contributed by a single donation: the fixed-point
/// square root of the amount. Weights from separate donations accumulate,
/// so many small donations outweigh one large donation of equal total.
pub fn donation_weight(amount: u64) -> u64 {
    // amount * 10^6 < 2^84, and its root fits u64 with room to spare.
    isqrt(amount as u128 * WEIGHT_SCALE) as u64
}
