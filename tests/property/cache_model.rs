//! Model check of the dispatch cache against a `HashMap`.
//!
//! For random streams of vtable-shaped keys at every supported arity: no key
//! is lost or duplicated, values persist across reconfigurations, and a value
//! keeps its address for the life of the cache.

use std::collections::HashMap;

use proptest::prelude::*;

use typeswitch_rs::{DispatchCache, DispatchKey};

/// Vtable-shaped word: aligned, clustered above a common base.
fn vtable_word() -> impl Strategy<Value = usize> + Clone {
    (0usize..64, 0u32..4).prop_map(|(ordinal, spread)| 0x5555_0000_0000 + (ordinal << (4 + spread)))
}

fn key_stream<const N: usize>() -> impl Strategy<Value = Vec<[usize; N]>> {
    prop::collection::vec(prop::array::uniform::<_, N>(vtable_word()), 1..200)
}

fn check_against_model<const N: usize>(
    stream: &[[usize; N]],
    hint: usize,
) -> Result<(), TestCaseError> {
    let mut cache: DispatchCache<u64, N> = DispatchCache::new(hint);
    let mut model: HashMap<[usize; N], (u64, usize)> = HashMap::new();

    for (step, words) in stream.iter().enumerate() {
        let key = DispatchKey::new(*words);
        let value = cache.get(key);
        let addr = value as *mut u64 as usize;
        match model.get_mut(words) {
            Some((expected, expected_addr)) => {
                prop_assert_eq!(*expected, *value);
                prop_assert_eq!(*expected_addr, addr, "value moved at step {}", step);
                *value += 1;
                *expected += 1;
            }
            None => {
                prop_assert_eq!(0, *value, "new key saw a stale value");
                *value = 1;
                model.insert(*words, (1, addr));
            }
        }
        prop_assert_eq!(model.len(), cache.len());
    }

    cache.check_invariants();
    for (words, (count, addr)) in &model {
        let key = DispatchKey::new(*words);
        prop_assert!(cache.contains(&key));
        prop_assert_eq!(Some(count), cache.peek(&key));
        prop_assert_eq!(*addr, cache.get(key) as *mut u64 as usize);
    }
    prop_assert_eq!(model.len(), cache.iter().count());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arity_1_matches_model(stream in key_stream::<1>(), hint in 0usize..32) {
        check_against_model(&stream, hint)?;
    }

    #[test]
    fn arity_2_matches_model(stream in key_stream::<2>(), hint in 0usize..32) {
        check_against_model(&stream, hint)?;
    }

    #[test]
    fn arity_3_matches_model(stream in key_stream::<3>(), hint in 0usize..32) {
        check_against_model(&stream, hint)?;
    }

    #[test]
    fn arity_4_matches_model(stream in key_stream::<4>(), hint in 0usize..32) {
        check_against_model(&stream, hint)?;
    }

    #[test]
    fn arbitrary_words_match_model(
        stream in prop::collection::vec(prop::array::uniform2(1usize..=usize::MAX), 1..120),
    ) {
        check_against_model(&stream, 0)?;
    }
}
