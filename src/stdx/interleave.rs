//! Bit interleaving (Morton order) for 2, 3, and 4 inputs.
//!
//! Purpose: combine the low bits of several per-key windows into one index so
//! that the table size grows with the total diversity of the keys rather than
//! multiplicatively with their count.
//!
//! Layout:
//! - Bit `i` of argument `j` lands at output bit `i * N + j`, where `N` is the
//!   number of arguments.
//! - `interleave_2` uses the low 32 bits of each input, `interleave_3` the low
//!   21 bits, `interleave_4` the low 16 bits. Higher input bits are ignored.
//!
//! Two families are provided:
//! - Direct: shift-and-mask "spread" sequences, no memory traffic.
//! - Table-driven: 256-entry spread tables built at compile time, applied to
//!   8-bit chunks.
//!
//! Both families produce bit-identical results for every input; the tests
//! check this exhaustively on 8-bit chunks and by property on full widths.

/// Usable input bits for each interleave arity (index = arity).
pub const INPUT_BITS: [u32; 5] = [0, 64, 32, 21, 16];

const MASK_21: u64 = (1 << 21) - 1;

/// Spreads the low 32 bits of `x` so bit `i` lands at bit `2i`.
#[inline(always)]
const fn spread_by_1(x: u64) -> u64 {
    let mut x = x & 0x0000_0000_FFFF_FFFF;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    (x | (x << 1)) & 0x5555_5555_5555_5555
}

/// Spreads the low 21 bits of `x` so bit `i` lands at bit `3i`.
#[inline(always)]
const fn spread_by_2(x: u64) -> u64 {
    let mut x = x & MASK_21;
    x = (x | (x << 32)) & 0x001F_0000_0000_FFFF;
    x = (x | (x << 16)) & 0x001F_0000_FF00_00FF;
    x = (x | (x << 8)) & 0x100F_00F0_0F00_F00F;
    x = (x | (x << 4)) & 0x10C3_0C30_C30C_30C3;
    (x | (x << 2)) & 0x1249_2492_4924_9249
}

/// Spreads the low 16 bits of `x` so bit `i` lands at bit `4i`.
#[inline(always)]
const fn spread_by_3(x: u64) -> u64 {
    let mut x = x & 0xFFFF;
    x = (x | (x << 24)) & 0x0000_00FF_0000_00FF;
    x = (x | (x << 12)) & 0x000F_000F_000F_000F;
    x = (x | (x << 6)) & 0x0303_0303_0303_0303;
    (x | (x << 3)) & 0x1111_1111_1111_1111
}

/// Interleaves the low 32 bits of `x` and `y`; `x` occupies the even bits.
///
/// # Examples
/// ```
/// use typeswitch_rs::stdx::interleave::interleave_2;
///
/// assert_eq!(interleave_2(0b11, 0b00), 0b0101);
/// assert_eq!(interleave_2(0b00, 0b11), 0b1010);
/// ```
#[inline]
pub const fn interleave_2(x: u32, y: u32) -> u64 {
    spread_by_1(x as u64) | (spread_by_1(y as u64) << 1)
}

/// Interleaves the low 21 bits of `x`, `y`, and `z`.
#[inline]
pub const fn interleave_3(x: u32, y: u32, z: u32) -> u64 {
    spread_by_2(x as u64) | (spread_by_2(y as u64) << 1) | (spread_by_2(z as u64) << 2)
}

/// Interleaves the 16 bits of `a`, `b`, `c`, and `d`.
#[inline]
pub const fn interleave_4(a: u16, b: u16, c: u16, d: u16) -> u64 {
    spread_by_3(a as u64)
        | (spread_by_3(b as u64) << 1)
        | (spread_by_3(c as u64) << 2)
        | (spread_by_3(d as u64) << 3)
}

// ----- Table-driven variants -----

const fn build_spread_table(stride: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut spread = 0u32;
        let mut bit = 0u32;
        while bit < 8 {
            if byte & (1 << bit) != 0 {
                spread |= 1 << (bit * stride);
            }
            bit += 1;
        }
        table[byte] = spread;
        byte += 1;
    }
    table
}

/// Byte spread with stride 2 (bit `i` at `2i`).
pub static SPREAD_2: [u32; 256] = build_spread_table(2);
/// Byte spread with stride 3 (bit `i` at `3i`).
pub static SPREAD_3: [u32; 256] = build_spread_table(3);
/// Byte spread with stride 4 (bit `i` at `4i`).
pub static SPREAD_4: [u32; 256] = build_spread_table(4);

#[inline(always)]
fn chunk(x: u32, index: u32) -> usize {
    ((x >> (index * 8)) & 0xFF) as usize
}

/// Table-driven equivalent of [`interleave_2`].
#[inline]
pub fn interleave_2_table(x: u32, y: u32) -> u64 {
    let mut out = 0u64;
    for c in 0..4 {
        let lane = SPREAD_2[chunk(x, c)] as u64 | ((SPREAD_2[chunk(y, c)] as u64) << 1);
        out |= lane << (c * 16);
    }
    out
}

/// Table-driven equivalent of [`interleave_3`].
#[inline]
pub fn interleave_3_table(x: u32, y: u32, z: u32) -> u64 {
    let (x, y, z) = (
        x & MASK_21 as u32,
        y & MASK_21 as u32,
        z & MASK_21 as u32,
    );
    let mut out = 0u64;
    for c in 0..3 {
        let lane = SPREAD_3[chunk(x, c)] as u64
            | ((SPREAD_3[chunk(y, c)] as u64) << 1)
            | ((SPREAD_3[chunk(z, c)] as u64) << 2);
        out |= lane << (c * 24);
    }
    out
}

/// Table-driven equivalent of [`interleave_4`].
#[inline]
pub fn interleave_4_table(a: u16, b: u16, c: u16, d: u16) -> u64 {
    let (a, b, c, d) = (a as u32, b as u32, c as u32, d as u32);
    let mut out = 0u64;
    for k in 0..2 {
        let lane = SPREAD_4[chunk(a, k)] as u64
            | ((SPREAD_4[chunk(b, k)] as u64) << 1)
            | ((SPREAD_4[chunk(c, k)] as u64) << 2)
            | ((SPREAD_4[chunk(d, k)] as u64) << 3);
        out |= lane << (k * 32);
    }
    out
}
