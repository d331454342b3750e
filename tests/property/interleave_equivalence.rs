//! Direct and table-driven interleaving agree on every input.

use proptest::prelude::*;

use typeswitch_rs::stdx::interleave::{
    interleave_2, interleave_2_table, interleave_3, interleave_3_table, interleave_4,
    interleave_4_table,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn two_way(a in any::<u32>(), b in any::<u32>()) {
        prop_assert_eq!(interleave_2(a, b), interleave_2_table(a, b));
    }

    #[test]
    fn three_way(a in any::<u32>(), b in any::<u32>(), c in any::<u32>()) {
        prop_assert_eq!(interleave_3(a, b, c), interleave_3_table(a, b, c));
    }

    #[test]
    fn four_way(a in any::<u16>(), b in any::<u16>(), c in any::<u16>(), d in any::<u16>()) {
        prop_assert_eq!(interleave_4(a, b, c, d), interleave_4_table(a, b, c, d));
    }
}
