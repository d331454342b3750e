//! Layout evolution: the table only grows, and stays big enough for its keys.

use proptest::prelude::*;

use typeswitch_rs::{DispatchCache, DispatchKey, Tuning};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn log_size_never_shrinks(
        words in prop::collection::vec((1usize..4096, 1usize..4096), 1..300),
        hint in 0usize..64,
    ) {
        let mut cache: DispatchCache<(), 2> = DispatchCache::new(hint);
        let mut last = cache.log_size();
        let mut searches = cache.reconfigurations();
        for (a, b) in words {
            cache.get(DispatchKey::new([a << 3, b << 3]));
            prop_assert!(cache.log_size() >= last);
            prop_assert!(cache.reconfigurations() >= searches);
            prop_assert!(cache.len() <= 1usize << cache.log_size());
            last = cache.log_size();
            searches = cache.reconfigurations();
        }
        cache.check_invariants();
    }

    #[test]
    fn tuning_bounds_are_honoured(
        words in prop::collection::hash_set(1usize..1 << 20, 1..200),
        max_log_inc in 0u32..3,
        max_candidates in 1usize..64,
    ) {
        let tuning = Tuning {
            max_log_inc,
            max_candidates,
            ..Tuning::default()
        };
        let mut cache: DispatchCache<usize, 1> = DispatchCache::with_tuning(2, tuning);
        for &w in &words {
            *cache.get(DispatchKey::new([w << 3])) = w;
        }
        let needed = usize::BITS - (words.len() - 1).leading_zeros();
        prop_assert!(cache.log_size() <= needed.max(1) + max_log_inc);
        for &w in &words {
            prop_assert_eq!(Some(&w), cache.peek(&DispatchKey::new([w << 3])));
        }
    }
}
