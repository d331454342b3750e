//! Diagnostics: report contents, display format, and tracing output.

use tracing_subscriber::fmt::format::FmtSpan;

use typeswitch_rs::{DispatchCache, DispatchKey};

fn grown_cache() -> DispatchCache<u32, 2> {
    let mut cache = DispatchCache::new(2);
    for a in 1..=6usize {
        for b in 1..=3usize {
            *cache.get(DispatchKey::new([a << 4, b << 8])) += 1;
        }
    }
    cache
}

#[test]
fn report_reflects_cache_state() {
    let cache = grown_cache();
    let report = cache.report();
    assert_eq!(2, report.arity);
    assert_eq!(18, report.keys);
    assert_eq!(cache.log_size(), report.log_size);
    assert_eq!(1usize << report.log_size, report.capacity);
    assert_eq!(cache.shifts().to_vec(), report.shifts);
    assert_eq!(cache.reconfigurations(), report.reconfigurations);
    assert!(report.reconfigurations >= 1);
    assert!(report.load_factor() > 0.0 && report.load_factor() <= 1.0);
    assert_eq!(cache.memory_used(), report.memory_bytes);

    let text = report.to_string();
    assert!(text.starts_with("arity=2 log_size="));
    assert!(text.contains("keys=18"));
}

#[cfg(feature = "stats")]
#[test]
fn stats_count_every_lookup() {
    let mut cache = grown_cache();
    let before = *cache.stats();
    assert_eq!(18, before.inserts);
    cache.get(DispatchKey::new([1 << 4, 1 << 8]));
    let after = cache.stats();
    assert_eq!(before.lookups() + 1, after.lookups());
    assert_eq!(cache.reconfigurations() as u64, after.reconfigurations);
    assert!(cache.report().to_string().contains("inserts=18"));
}

#[test]
fn reconfiguration_emits_tracing_events() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(FmtSpan::NONE)
        .with_test_writer()
        .try_init();

    let cache = grown_cache();
    assert_eq!(18, cache.len());
    cache.check_invariants();
}
