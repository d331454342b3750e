//! Worked scenarios: growth of a single-key cache and slot separation of a
//! two-key cache.

use typeswitch_rs::{DispatchCache, DispatchKey, IRRELEVANT_BITS};

#[test]
fn single_key_cache_grows_and_keeps_values_in_place() {
    let mut cache: DispatchCache<u64, 1> = DispatchCache::new(2);
    assert_eq!(1, cache.log_size());

    let keys = [0x1000usize, 0x2000, 0x3000, 0x4000];
    let mut addrs = Vec::new();
    for (i, &w) in keys.iter().enumerate() {
        let value = cache.get(DispatchKey::new([w]));
        *value = w as u64;
        addrs.push(value as *mut u64 as usize);
        if i == 2 {
            assert!(cache.log_size() >= 2, "third key must grow the table");
        }
    }

    addrs.sort_unstable();
    addrs.dedup();
    assert_eq!(4, addrs.len(), "every key owns distinct storage");

    for &w in &keys {
        assert_eq!(w as u64, *cache.get(DispatchKey::new([w])));
    }
    // The search moves the shift up to where these keys differ.
    assert_eq!([12], cache.shifts());
    assert_eq!(4, cache.len());
    cache.check_invariants();
}

#[test]
fn two_key_cache_separates_every_pair() {
    let mut cache: DispatchCache<u32, 2> = DispatchCache::new(2);
    let keys = [
        DispatchKey::new([0xA0, 0xB0]),
        DispatchKey::new([0xA0, 0xC0]),
        DispatchKey::new([0xA4, 0xB0]),
    ];
    for (i, key) in keys.iter().enumerate() {
        *cache.get(*key) = i as u32 + 1;
    }

    let layout = cache.layout();
    let mut homes: Vec<usize> = keys.iter().map(|k| layout.index(k)).collect();
    homes.sort_unstable();
    homes.dedup();
    assert_eq!(3, homes.len(), "keys must have distinct home slots");
    assert_eq!(0, cache.report().displaced);

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(i as u32 + 1, *cache.get(*key));
    }
    cache.check_invariants();
}

#[test]
fn repeated_lookups_do_not_reconfigure() {
    let mut cache: DispatchCache<u8, 1> = DispatchCache::new(8);
    for i in 1..=8usize {
        cache.get(DispatchKey::new([i << IRRELEVANT_BITS]));
    }
    let layout = cache.layout();
    let searches = cache.reconfigurations();
    for _ in 0..100 {
        for i in 1..=8usize {
            cache.get(DispatchKey::new([i << IRRELEVANT_BITS]));
        }
    }
    assert_eq!(layout, cache.layout());
    assert_eq!(searches, cache.reconfigurations());
    assert_eq!(0, searches, "aligned sequential keys fit the initial layout");
}
