//! Type-identity extraction and sub-object pointer adjustment.
//!
//! This is the only module that reads pointer metadata or does raw pointer
//! arithmetic. Everything above it (the dispatch cache) works on opaque
//! machine words.
//!
//! Identity sources:
//! - [`TypeIdentity`] for `dyn Any`: the vtable address of the trait object.
//!   Cheapest, and the low bits are aligned and mostly constant, which the
//!   reconfiguration search exploits by shifting them away.
//! - [`vtable_identity`]: the same for any other `dyn Trait`. It is `unsafe`
//!   because the compiler cannot tell a trait object from a slice here.
//! - [`type_id_identity`]: a word derived from `TypeId` by hashing with fixed
//!   seeds. Stable within a process run, works for sized types.
//!
//! Invariants:
//! - Both sources return `NonZeroUsize`; zero is reserved for free slots.
//! - A given type may map to more than one vtable address (codegen units can
//!   duplicate vtables). That only costs an extra cache entry; two different
//!   types never share a vtable of the same trait.

use std::any::{Any, TypeId};
use std::hash::{BuildHasher, Hash, Hasher};
use std::num::NonZeroUsize;

use ahash::RandomState;

/// Fixed seeds so identities do not depend on per-process randomness.
const IDENTITY_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Source of a per-runtime-type identity word for a switch subject.
pub trait TypeIdentity {
    /// Returns a non-zero word that is equal for objects of the same dynamic
    /// type and differs between different dynamic types.
    fn type_identity(&self) -> NonZeroUsize;
}

impl TypeIdentity for dyn Any {
    #[inline]
    fn type_identity(&self) -> NonZeroUsize {
        // SAFETY: `self` is a trait object.
        unsafe { vtable_identity(self) }
    }
}

impl TypeIdentity for dyn Any + Send {
    #[inline]
    fn type_identity(&self) -> NonZeroUsize {
        // SAFETY: `self` is a trait object.
        unsafe { vtable_identity(self) }
    }
}

impl TypeIdentity for dyn Any + Send + Sync {
    #[inline]
    fn type_identity(&self) -> NonZeroUsize {
        // SAFETY: `self` is a trait object.
        unsafe { vtable_identity(self) }
    }
}

/// Returns the vtable address of a trait object as an identity word.
///
/// Thin references are rejected at monomorphization time.
///
/// # Safety
///
/// `T` must be a `dyn Trait` type. Slices and `str` are also fat, and for
/// them the second word is a length: equal lengths of different element
/// types would share an identity.
///
/// ```compile_fail
/// // Not callable without `unsafe`.
/// let id = typeswitch_rs::vtable_identity(&[1u8, 2][..]);
/// ```
#[inline]
pub unsafe fn vtable_identity<T: ?Sized>(object: &T) -> NonZeroUsize {
    const {
        assert!(
            size_of::<&T>() == 2 * size_of::<usize>(),
            "vtable_identity requires a trait object reference"
        )
    };
    // SAFETY: `&dyn Trait` is a (data, vtable) pair of non-null pointers. The
    // size check above rules out thin pointers; the caller rules out slices.
    let words: [usize; 2] = unsafe { std::mem::transmute_copy(&object) };
    match NonZeroUsize::new(words[1]) {
        Some(vtable) => vtable,
        None => unreachable!("trait object metadata is a non-null vtable pointer"),
    }
}

/// Returns an identity word for the static type `T`, derived from its `TypeId`.
pub fn type_id_identity<T: ?Sized + 'static>() -> NonZeroUsize {
    identity_of_type_id(TypeId::of::<T>())
}

/// Maps a `TypeId` to a non-zero identity word.
pub fn identity_of_type_id(id: TypeId) -> NonZeroUsize {
    let [a, b, c, d] = IDENTITY_SEEDS;
    let mut hasher = RandomState::with_seeds(a, b, c, d).build_hasher();
    id.hash(&mut hasher);
    let word = hasher.finish() as usize;
    // Bit 0 is forced so the word is never zero; the search shifts it away.
    NonZeroUsize::new(word | 1).unwrap_or(NonZeroUsize::MIN)
}

/// Byte offset from `base` to `sub`, the value stored in
/// [`SwitchInfo::offsets`](crate::SwitchInfo).
#[inline]
pub fn subobject_offset<B: ?Sized, S: ?Sized>(base: &B, sub: &S) -> isize {
    let base = base as *const B as *const u8 as usize;
    let sub = sub as *const S as *const u8 as usize;
    sub.wrapping_sub(base) as isize
}

/// Applies a stored byte offset to a subject pointer.
///
/// # Safety
///
/// `offset` must have been produced by [`subobject_offset`] for an object of
/// the same dynamic type as `base`, with the sub-object of type `S`, and the
/// resulting reference must not outlive `base`.
#[inline]
pub unsafe fn adjust_ptr<'a, B: ?Sized, S>(base: &'a B, offset: isize) -> &'a S {
    let ptr = (base as *const B as *const u8).wrapping_offset(offset) as *const S;
    // SAFETY: caller guarantees the offset lands on a live, aligned `S`
    // inside `base`.
    unsafe { &*ptr }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape {
        fn sides(&self) -> u32;
    }

    struct Triangle;
    struct Square;

    impl Shape for Triangle {
        fn sides(&self) -> u32 {
            3
        }
    }

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[test]
    fn same_type_same_vtable_identity() {
        let a: Box<dyn Shape> = Box::new(Triangle);
        let b: Box<dyn Shape> = Box::new(Triangle);
        let c: Box<dyn Shape> = Box::new(Square);
        // SAFETY: all three are `dyn Shape` trait objects.
        let (ia, ib, ic) = unsafe {
            (
                vtable_identity(&*a),
                vtable_identity(&*b),
                vtable_identity(&*c),
            )
        };
        assert_eq!(ia, ib);
        assert_ne!(ia, ic);
        assert_eq!(7, a.sides() + c.sides());
    }

    #[test]
    fn any_objects_use_vtables() {
        let x: &dyn Any = &5u32;
        let y: &dyn Any = &6u32;
        let z: &dyn Any = &"str";
        assert_eq!(x.type_identity(), y.type_identity());
        assert_ne!(x.type_identity(), z.type_identity());
    }

    #[test]
    fn any_identity_separates_slice_element_types() {
        let bytes: Box<dyn Any> = Box::new([1u8, 2]);
        let words: Box<dyn Any> = Box::new([7u32, 8]);
        let empty: Box<dyn Any> = Box::new(Vec::<u8>::new());
        assert_ne!(bytes.type_identity(), words.type_identity());
        assert_ne!(bytes.type_identity(), empty.type_identity());
    }

    #[test]
    fn type_id_identity_is_stable_and_distinct() {
        assert_eq!(type_id_identity::<u32>(), type_id_identity::<u32>());
        assert_ne!(type_id_identity::<u32>(), type_id_identity::<u64>());
        assert_eq!(
            type_id_identity::<String>(),
            identity_of_type_id(TypeId::of::<String>())
        );
    }

    #[repr(C)]
    struct Outer {
        head: u64,
        inner: Inner,
    }

    #[repr(C)]
    struct Inner {
        value: u32,
    }

    #[test]
    fn offset_roundtrip_reaches_subobject() {
        let outer = Outer {
            head: 1,
            inner: Inner { value: 42 },
        };
        let offset = subobject_offset(&outer, &outer.inner);
        assert_eq!(8, offset);
        // SAFETY: offset computed from the same object just above.
        let inner: &Inner = unsafe { adjust_ptr(&outer, offset) };
        assert_eq!(42, inner.value);
        assert_eq!(1, outer.head);
    }
}
