use proptest::prelude::*;
use qf_math::{donation_weight, isqrt, match_amounts, match_share, quadratic_score, total_score};

proptest! {
    /// Property: isqrt(n) is the floor of the true root.
    #[test]
    fn prop_isqrt_bounds(n in 0u128..(1u128 << 120)) {
        let r = isqrt(n);
        prop_assert!(r * r <= n);
        prop_assert!((r + 1) * (r + 1) > n);
    }

    /// Property: isqrt never decreases as its input grows.
    #[test]
    fn prop_isqrt_monotonic(a in 0u128..(1u128 << 100), b in 0u128..(1u128 << 100)) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(isqrt(lo) <= isqrt(hi));
    }

    /// Property: donation weights inherit isqrt's monotonicity, so a
    /// proposal's accumulated weight can only grow with more donations.
    #[test]
    fn prop_donation_weight_monotonic(a in 0u64..1_000_000_000, b in 0u64..1_000_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(donation_weight(lo) <= donation_weight(hi));
    }

    /// Property: splitting a donation never lowers the combined weight.
    /// Classical quadratic funding: many small donors beat one large donor.
    #[test]
    fn prop_split_donation_weighs_more(a in 1u64..1_000_000, b in 1u64..1_000_000) {
        prop_assert!(donation_weight(a) + donation_weight(b) >= donation_weight(a + b));
    }

    /// Property: the distributed matches never exceed the pool, and floor
    /// rounding loses less than one base unit per proposal.
    #[test]
    fn prop_match_conservation(
        mut weights in prop::collection::vec(0u64..10_000_000, 1..16),
        seed in 1u64..10_000_000,
        pool in 0u64..1_000_000_000,
    ) {
        // At least one funded proposal, otherwise the pool stays untouched.
        weights[0] = seed;

        let matches = match_amounts(&weights, pool).unwrap();
        let distributed: u64 = matches.iter().sum();
        prop_assert!(distributed <= pool);
        prop_assert!(pool - distributed < weights.len() as u64);
    }

    /// Property: a round with no donations pays out nothing at all.
    #[test]
    fn prop_empty_round_pays_nothing(
        n in 1usize..16,
        pool in 0u64..1_000_000_000,
    ) {
        let weights = vec![0u64; n];
        let matches = match_amounts(&weights, pool).unwrap();
        prop_assert!(matches.iter().all(|&m| m == 0));
    }

    /// Property: shares are proportional, so no proposal can be paid more
    /// than the whole pool.
    #[test]
    fn prop_share_bounded_by_pool(
        weights in prop::collection::vec(0u64..10_000_000, 1..16),
        pool in 0u64..1_000_000_000,
    ) {
        let total = total_score(&weights).unwrap();
        for &w in &weights {
            let share = match_share(quadratic_score(w), total, pool).unwrap();
            prop_assert!(share <= pool);
        }
    }

    /// Property: recomputation from unchanged aggregates is identical.
    #[test]
    fn prop_recomputation_is_stable(
        weights in prop::collection::vec(0u64..10_000_000, 1..16),
        pool in 0u64..1_000_000_000,
    ) {
        prop_assert_eq!(
            match_amounts(&weights, pool).unwrap(),
            match_amounts(&weights, pool).unwrap()
        );
    }
}
