//! Demonstration type switches driven by a dispatch cache.
//!
//! - [`AreaSwitch`]: one subject, cases for three shapes plus a square
//!   embedded in a larger struct, which needs a cached pointer adjustment.
//! - [`CollisionSwitch`]: two subjects, one decision per pair of dynamic types.
//!
//! Both run their case list once per distinct key and count those runs, so
//! tests can observe cache hits.

use std::any::Any;

use crate::api::{DispatchKey, SwitchInfo};
use crate::dispatch::DispatchCache;
use crate::identity::{adjust_ptr, subobject_offset, TypeIdentity};

// --------------------------
// Demo shapes
// --------------------------

/// Circle subject.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

/// Square subject.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Square {
    pub side: f64,
}

/// Triangle subject.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub base: f64,
    pub height: f64,
}

/// A square embedded after a header, so the square branch needs a non-zero
/// pointer adjustment to reach it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Labeled {
    pub label: &'static str,
    pub shape: Square,
}

impl Circle {
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }
}

impl Square {
    pub fn area(&self) -> f64 {
        self.side * self.side
    }
}

impl Triangle {
    pub fn area(&self) -> f64 {
        0.5 * self.base * self.height
    }
}

/// Case branch of the demo switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
}

/// Branch recorded for subjects no case matches.
const NO_MATCH: u32 = u32::MAX;

impl ShapeKind {
    const ALL: [ShapeKind; 3] = [ShapeKind::Circle, ShapeKind::Square, ShapeKind::Triangle];

    #[inline]
    fn ordinal(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Runs the case list against `subject` and returns the matched branch
    /// plus the byte offset of the sub-object it expects.
    ///
    /// This is the slow path: it runs once per distinct dynamic type.
    pub fn classify(subject: &dyn Any) -> Option<(Self, isize)> {
        if let Some(circle) = subject.downcast_ref::<Circle>() {
            return Some((ShapeKind::Circle, subobject_offset(subject, circle)));
        }
        if let Some(square) = subject.downcast_ref::<Square>() {
            return Some((ShapeKind::Square, subobject_offset(subject, square)));
        }
        if let Some(triangle) = subject.downcast_ref::<Triangle>() {
            return Some((ShapeKind::Triangle, subobject_offset(subject, triangle)));
        }
        if let Some(labeled) = subject.downcast_ref::<Labeled>() {
            return Some((ShapeKind::Square, subobject_offset(subject, &labeled.shape)));
        }
        None
    }

    /// Runs this branch on `subject` using a cached offset.
    ///
    /// # Safety
    ///
    /// `offset` must come from [`ShapeKind::classify`] returning `self` for a
    /// subject of the same dynamic type.
    unsafe fn area_at(self, subject: &dyn Any, offset: isize) -> f64 {
        // SAFETY: forwarded from the caller.
        unsafe {
            match self {
                ShapeKind::Circle => adjust_ptr::<dyn Any, Circle>(subject, offset).area(),
                ShapeKind::Square => adjust_ptr::<dyn Any, Square>(subject, offset).area(),
                ShapeKind::Triangle => adjust_ptr::<dyn Any, Triangle>(subject, offset).area(),
            }
        }
    }
}

#[inline]
fn key_of<const N: usize>(subjects: [&dyn Any; N]) -> DispatchKey<N> {
    DispatchKey::from_identities(subjects.map(|s| s.type_identity()))
}

// --------------------------
// Single-subject switch
// --------------------------

/// `match subject { Circle => .., Square => .., Triangle => .. }` returning the
/// area, with the decision cached per dynamic type.
#[derive(Debug)]
pub struct AreaSwitch {
    cache: DispatchCache<SwitchInfo<1>, 1>,
    resolutions: u64,
}

impl Default for AreaSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaSwitch {
    pub fn new() -> Self {
        Self {
            cache: DispatchCache::new(4),
            resolutions: 0,
        }
    }

    /// Area of `subject`, or `None` when no case matches.
    pub fn area(&mut self, subject: &dyn Any) -> Option<f64> {
        let info = self.cache.get(key_of([subject]));
        if !info.is_resolved() {
            self.resolutions += 1;
            match ShapeKind::classify(subject) {
                Some((kind, offset)) => info.resolve(kind.ordinal() + 1, [offset]),
                None => info.resolve(NO_MATCH, [0]),
            }
        }
        let kind = ShapeKind::from_ordinal(info.target.wrapping_sub(1))?;
        // SAFETY: the info for this key was resolved by `classify` on a subject
        // of the same dynamic type.
        Some(unsafe { kind.area_at(subject, info.offsets[0]) })
    }

    /// Times the case list ran (cache misses).
    pub fn resolutions(&self) -> u64 {
        self.resolutions
    }

    pub fn cache(&self) -> &DispatchCache<SwitchInfo<1>, 1> {
        &self.cache
    }
}

// --------------------------
// Double dispatch
// --------------------------

/// Kind of contact between two shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    Roll,
    Bounce,
    Stack,
    Pierce,
}

impl Contact {
    fn between(a: ShapeKind, b: ShapeKind) -> Self {
        match (a, b) {
            (ShapeKind::Triangle, _) | (_, ShapeKind::Triangle) => Contact::Pierce,
            (ShapeKind::Circle, ShapeKind::Circle) => Contact::Roll,
            (ShapeKind::Square, ShapeKind::Square) => Contact::Stack,
            _ => Contact::Bounce,
        }
    }
}

/// Result of [`CollisionSwitch::collide`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub contact: Contact,
    /// Area of the smaller shape.
    pub overlap: f64,
}

/// Two-subject switch over shape pairs, cached per pair of dynamic types.
#[derive(Debug)]
pub struct CollisionSwitch {
    cache: DispatchCache<SwitchInfo<2>, 2>,
    resolutions: u64,
}

impl Default for CollisionSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionSwitch {
    const KINDS: u32 = ShapeKind::ALL.len() as u32;

    pub fn new() -> Self {
        Self {
            cache: DispatchCache::new(9),
            resolutions: 0,
        }
    }

    /// Collides `a` with `b`, or `None` when either is not a shape.
    pub fn collide(&mut self, a: &dyn Any, b: &dyn Any) -> Option<Collision> {
        let info = self.cache.get(key_of([a, b]));
        if !info.is_resolved() {
            self.resolutions += 1;
            match (ShapeKind::classify(a), ShapeKind::classify(b)) {
                (Some((ka, oa)), Some((kb, ob))) => {
                    let target = 1 + ka.ordinal() * Self::KINDS + kb.ordinal();
                    info.resolve(target, [oa, ob]);
                }
                _ => info.resolve(NO_MATCH, [0, 0]),
            }
        }
        let pair = info.target.wrapping_sub(1);
        let ka = ShapeKind::from_ordinal(pair / Self::KINDS)?;
        let kb = ShapeKind::from_ordinal(pair % Self::KINDS)?;
        // SAFETY: both offsets were recorded by `classify` for these dynamic
        // types when the pair was resolved.
        let (area_a, area_b) = unsafe {
            (
                ka.area_at(a, info.offsets[0]),
                kb.area_at(b, info.offsets[1]),
            )
        };
        Some(Collision {
            contact: Contact::between(ka, kb),
            overlap: area_a.min(area_b),
        })
    }

    /// Times the case list ran (cache misses).
    pub fn resolutions(&self) -> u64 {
        self.resolutions
    }

    pub fn cache(&self) -> &DispatchCache<SwitchInfo<2>, 2> {
        &self.cache
    }
}
