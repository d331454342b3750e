//! End-to-end type switches over trait objects.

use std::any::Any;

use typeswitch_rs::{
    vtable_identity, AreaSwitch, Circle, CollisionSwitch, Contact, DispatchCache, DispatchKey,
    Labeled, Square, SwitchInfo, Triangle, TypeIdentity,
};

fn zoo() -> Vec<Box<dyn Any>> {
    vec![
        Box::new(Circle { radius: 2.0 }),
        Box::new(Square { side: 3.0 }),
        Box::new(Triangle {
            base: 2.0,
            height: 5.0,
        }),
        Box::new(Labeled {
            label: "box",
            shape: Square { side: 4.0 },
        }),
        Box::new(42u32),
    ]
}

#[test]
fn area_switch_over_a_mixed_stream() {
    let shapes = zoo();
    let mut switch = AreaSwitch::new();
    let mut total = 0.0;
    for _ in 0..50 {
        for shape in &shapes {
            total += switch.area(&**shape).unwrap_or(0.0);
        }
    }
    let expected = 50.0 * (4.0 * std::f64::consts::PI + 9.0 + 5.0 + 16.0);
    assert!((total - expected).abs() < 1e-6);
    assert_eq!(5, switch.resolutions());
    switch.cache().check_invariants();
}

#[test]
fn collision_switch_over_all_pairs() {
    let shapes = zoo();
    let mut switch = CollisionSwitch::new();
    let mut contacts = Vec::new();
    for _ in 0..3 {
        contacts.clear();
        for a in &shapes {
            for b in &shapes {
                contacts.push(switch.collide(&**a, &**b).map(|c| c.contact));
            }
        }
    }
    assert_eq!(25, switch.resolutions());
    assert_eq!(25, switch.cache().len());
    assert_eq!(Some(Contact::Roll), contacts[0]);
    assert_eq!(Some(Contact::Stack), contacts[5 + 3]);
    assert_eq!(Some(Contact::Pierce), contacts[2 * 5]);
    assert_eq!(None, contacts[24]);
    switch.cache().check_invariants();
}

trait Visitor {
    fn name(&self) -> &'static str;
}

struct Printer;
struct Counter;

impl Visitor for Printer {
    fn name(&self) -> &'static str {
        "printer"
    }
}

impl Visitor for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }
}

#[test]
fn hand_written_switch_over_a_custom_trait() {
    let visitors: Vec<Box<dyn Visitor>> = vec![Box::new(Printer), Box::new(Counter)];
    let mut cache: DispatchCache<SwitchInfo<1>, 1> = DispatchCache::new(2);
    let mut misses = 0;
    for _ in 0..10 {
        for v in &visitors {
            // SAFETY: `&dyn Visitor` is a trait object.
            let id = unsafe { vtable_identity(&**v) };
            let info = cache.get(DispatchKey::from_identities([id]));
            if !info.is_resolved() {
                misses += 1;
                let target = if v.name() == "printer" { 1 } else { 2 };
                info.resolve(target, [0]);
            }
            let expected = if v.name() == "printer" { 1 } else { 2 };
            assert_eq!(expected, info.target);
        }
    }
    assert_eq!(2, misses);
}

#[test]
fn any_identity_matches_vtable_identity() {
    let value: Box<dyn Any + Send> = Box::new(1.5f32);
    // SAFETY: `dyn Any + Send` is a trait object.
    assert_eq!(value.type_identity(), unsafe { vtable_identity(&*value) });
}
