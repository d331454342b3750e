//! Construction-time validation of tuning knobs.

use typeswitch_rs::{DispatchCache, Tuning, TuningError};

#[test]
fn try_with_tuning_reports_each_error() {
    let inverted = Tuning {
        min_log_size: 10,
        max_log_size: 4,
        ..Tuning::default()
    };
    let err = DispatchCache::<u8, 1>::try_with_tuning(4, inverted).unwrap_err();
    assert_eq!(TuningError::LogSizeRange { min: 10, max: 4 }, err);
    assert!(err.to_string().contains("10"));

    let huge = Tuning {
        max_log_size: usize::BITS,
        ..Tuning::default()
    };
    assert!(matches!(
        DispatchCache::<u8, 2>::try_with_tuning(4, huge),
        Err(TuningError::LogSizeTooLarge { .. })
    ));

    let shift = Tuning {
        initial_shift: usize::BITS,
        ..Tuning::default()
    };
    assert!(matches!(
        DispatchCache::<u8, 3>::try_with_tuning(4, shift),
        Err(TuningError::ShiftTooLarge { .. })
    ));
}

#[test]
#[should_panic(expected = "invalid dispatch cache tuning")]
fn with_tuning_panics_on_invalid_knobs() {
    let tuning = Tuning {
        max_candidates: 0,
        ..Tuning::default()
    };
    let _ = DispatchCache::<u8, 1>::with_tuning(4, tuning);
}

#[test]
fn size_hint_is_clamped_to_tuning() {
    let tuning = Tuning {
        min_log_size: 3,
        max_log_size: 5,
        ..Tuning::default()
    };
    let small = DispatchCache::<u8, 1>::with_tuning(1, tuning);
    assert_eq!(3, small.log_size());
    let large = DispatchCache::<u8, 1>::with_tuning(1 << 20, tuning);
    assert_eq!(5, large.log_size());
    assert_eq!(&tuning, large.tuning());
}

#[test]
fn search_may_exceed_max_log_size_when_full() {
    let tuning = Tuning {
        max_log_size: 2,
        ..Tuning::default()
    };
    let mut cache = DispatchCache::<usize, 1>::with_tuning(4, tuning);
    for i in 1..=9usize {
        *cache.get(typeswitch_rs::DispatchKey::new([i << 4])) = i;
    }
    assert!(cache.log_size() >= 4);
    assert_eq!(9, cache.len());
    cache.check_invariants();
}
