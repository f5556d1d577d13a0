//! Properties of per-prompt seed draws

use proptest::prelude::*;
use sdbatch::generation::SeedPool;

proptest! {
    /// A prompt asking for `n` generations gets the first `min(n, len)` seeds, in order
    #[test]
    fn cursor_yields_pool_prefix(
        seeds in proptest::collection::vec(1u64..=u32::MAX as u64, 1..50),
        wanted in 0usize..80,
    ) {
        let pool = SeedPool::new(seeds.clone());
        let mut cursor = pool.cursor();
        let drawn: Vec<u64> = std::iter::from_fn(|| cursor.draw()).take(wanted).collect();

        let expected: Vec<u64> = seeds.iter().copied().take(wanted).collect();
        prop_assert_eq!(drawn, expected);

        // Every prompt starts again from the first seed
        prop_assert_eq!(pool.cursor().draw(), Some(seeds[0]));
    }
}
