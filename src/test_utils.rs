use crate::api::DispatchKey;

pub fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
}

fn is_ci() -> bool {
    std::env::var_os("CI").is_some()
}

pub fn proptest_cases(default: u32) -> u32 {
    if let Some(value) = env_u32("PROPTEST_CASES") {
        return value.max(1);
    }
    if is_ci() {
        return default.max(1);
    }
    default.clamp(1, 4)
}

/// Word shaped like a vtable address: 8-byte aligned, above a fixed base.
pub fn fake_vtable(ordinal: usize) -> usize {
    0x5555_0000_0000 + (ordinal << 5)
}

/// Key built from vtable-shaped words, one ordinal per position.
pub fn fake_key<const N: usize>(ordinals: [usize; N]) -> DispatchKey<N> {
    DispatchKey::new(ordinals.map(fake_vtable))
}
