//! Set-like merges over whole maps.
//!
//! Union and intersection reconcile the two root windows first, then
//! recurse over siblings. Both preserve sharing aggressively: a result
//! subtree that matches either input is returned as that input's node,
//! so repeated merges over mostly-identical maps touch only the
//! diverging spine.

use std::sync::Arc;

use crate::error::Error;
use crate::map::{prune, IntMap};
use crate::node::{self, Branch, Slot, BRANCH_BITS, BRANCH_FACTOR};

/// Union of two persistent maps; `meet` resolves keys bound on both
/// sides.
///
/// The windows are aligned upward first: the shallower map grows until
/// the shifts agree, then both grow in lockstep until their bases agree
/// (distinct aligned windows at one shift only meet higher up).
pub(crate) fn union_maps<V, M>(
    a: &IntMap<V>,
    b: &IntMap<V>,
    meet: &mut M,
) -> Result<IntMap<V>, Error>
where
    V: Clone + PartialEq,
    M: FnMut(u64, &V, &V) -> Result<V, Error>,
{
    if a.is_empty() {
        return Ok(b.clone());
    }
    if b.is_empty() {
        return Ok(a.clone());
    }
    let mut a = a.clone();
    let mut b = b.clone();
    while a.shift < b.shift {
        a = a.grow();
    }
    while b.shift < a.shift {
        b = b.grow();
    }
    while a.min != b.min {
        a = a.grow();
        b = b.grow();
    }
    let root = union_slot(&a.root, &b.root, a.min, a.shift, meet)?;
    Ok(IntMap {
        min: a.min,
        shift: a.shift,
        root,
    })
}

fn union_slot<V, M>(
    x: &Slot<V>,
    y: &Slot<V>,
    base: u64,
    shift: u32,
    meet: &mut M,
) -> Result<Slot<V>, Error>
where
    V: Clone + PartialEq,
    M: FnMut(u64, &V, &V) -> Result<V, Error>,
{
    match (x, y) {
        (Slot::Absent, _) => Ok(y.clone()),
        (_, Slot::Absent) => Ok(x.clone()),
        (Slot::Leaf(vx), Slot::Leaf(vy)) => {
            if vx == vy {
                Ok(x.clone())
            } else {
                Ok(Slot::Leaf(meet(base, vx, vy)?))
            }
        }
        (Slot::Branch(bx), Slot::Branch(by)) => {
            if Arc::ptr_eq(bx, by) {
                return Ok(x.clone());
            }
            let cs = shift - BRANCH_BITS;
            let mut merged = Branch::new(None);
            let mut from_x = true;
            let mut from_y = true;
            for d in 0..BRANCH_FACTOR {
                let child_base = base + ((d as u64) << cs);
                let child = union_slot(&bx.children[d], &by.children[d], child_base, cs, meet)?;
                from_x = from_x && node::slot_shares(&child, &bx.children[d]);
                from_y = from_y && node::slot_shares(&child, &by.children[d]);
                merged.children[d] = child;
            }
            if from_x {
                Ok(x.clone())
            } else if from_y {
                Ok(y.clone())
            } else {
                Ok(Slot::Branch(Arc::new(merged)))
            }
        }
        _ => panic!("leaf and branch cells at the same depth"),
    }
}

/// Intersection of two persistent maps; `meet` resolves values for the
/// surviving keys.
///
/// Window reconciliation descends instead of growing: the lower-based
/// map steps into the child that could overlap the higher one, and when
/// the bases agree the taller map steps into its first child. Any
/// absent step means the supports are disjoint and the result is the
/// canonical empty map. The result is pruned so its window shrinks to
/// the surviving support.
pub(crate) fn intersect_maps<V, M>(
    a: &IntMap<V>,
    b: &IntMap<V>,
    meet: &mut M,
) -> Result<IntMap<V>, Error>
where
    V: Clone + PartialEq,
    M: FnMut(u64, &V, &V) -> Result<V, Error>,
{
    if a.is_empty() || b.is_empty() {
        return Ok(IntMap::new());
    }
    if a.ptr_eq(b) {
        return Ok(a.clone());
    }
    let (mut slot_a, mut min_a, mut shift_a) = (&a.root, a.min, a.shift);
    let (mut slot_b, mut min_b, mut shift_b) = (&b.root, b.min, b.shift);
    loop {
        if min_a == min_b && shift_a == shift_b {
            break;
        }
        if min_a < min_b {
            if shift_a <= shift_b {
                return Ok(IntMap::new());
            }
            match descend_toward(slot_a, min_a, shift_a, min_b) {
                Some((slot, min, shift)) => (slot_a, min_a, shift_a) = (slot, min, shift),
                None => return Ok(IntMap::new()),
            }
        } else if min_b < min_a {
            if shift_b <= shift_a {
                return Ok(IntMap::new());
            }
            match descend_toward(slot_b, min_b, shift_b, min_a) {
                Some((slot, min, shift)) => (slot_b, min_b, shift_b) = (slot, min, shift),
                None => return Ok(IntMap::new()),
            }
        } else if shift_a > shift_b {
            match descend_first(slot_a, shift_a) {
                Some((slot, shift)) => (slot_a, shift_a) = (slot, shift),
                None => return Ok(IntMap::new()),
            }
        } else {
            match descend_first(slot_b, shift_b) {
                Some((slot, shift)) => (slot_b, shift_b) = (slot, shift),
                None => return Ok(IntMap::new()),
            }
        }
    }
    let root = intersect_slot(slot_a, slot_b, min_a, shift_a, meet)?;
    if matches!(root, Slot::Absent) {
        return Ok(IntMap::new());
    }
    Ok(prune(min_a, shift_a, root))
}

/// Steps one level down toward the child whose window could contain
/// `target`; `None` when the path is absent or `target` lies outside
/// the window entirely.
fn descend_toward<V>(
    slot: &Slot<V>,
    min: u64,
    shift: u32,
    target: u64,
) -> Option<(&Slot<V>, u64, u32)> {
    if !node::window_contains(min, shift, target) {
        return None;
    }
    let cs = shift - BRANCH_BITS;
    let d = node::digit(target - min, cs);
    match slot {
        Slot::Branch(b) => match &b.children[d] {
            Slot::Absent => None,
            child => Some((child, min + ((d as u64) << cs), cs)),
        },
        _ => panic!("leaf cell above leaf depth"),
    }
}

/// Steps the taller window into its first child; keys past the shorter
/// window cannot survive an intersection.
fn descend_first<V>(slot: &Slot<V>, shift: u32) -> Option<(&Slot<V>, u32)> {
    match slot {
        Slot::Branch(b) => match &b.children[0] {
            Slot::Absent => None,
            child => Some((child, shift - BRANCH_BITS)),
        },
        _ => panic!("leaf cell above leaf depth"),
    }
}

fn intersect_slot<V, M>(
    x: &Slot<V>,
    y: &Slot<V>,
    base: u64,
    shift: u32,
    meet: &mut M,
) -> Result<Slot<V>, Error>
where
    V: Clone + PartialEq,
    M: FnMut(u64, &V, &V) -> Result<V, Error>,
{
    match (x, y) {
        (Slot::Absent, _) | (_, Slot::Absent) => Ok(Slot::Absent),
        (Slot::Leaf(vx), Slot::Leaf(vy)) => {
            if vx == vy {
                Ok(x.clone())
            } else {
                Ok(Slot::Leaf(meet(base, vx, vy)?))
            }
        }
        (Slot::Branch(bx), Slot::Branch(by)) => {
            if Arc::ptr_eq(bx, by) {
                return Ok(x.clone());
            }
            let cs = shift - BRANCH_BITS;
            let mut merged = Branch::new(None);
            let mut any = false;
            let mut from_x = true;
            let mut from_y = true;
            for d in 0..BRANCH_FACTOR {
                let child_base = base + ((d as u64) << cs);
                let child = intersect_slot(&bx.children[d], &by.children[d], child_base, cs, meet)?;
                any = any || !matches!(child, Slot::Absent);
                from_x = from_x && node::slot_shares(&child, &bx.children[d]);
                from_y = from_y && node::slot_shares(&child, &by.children[d]);
                merged.children[d] = child;
            }
            if !any {
                Ok(Slot::Absent)
            } else if from_x {
                Ok(x.clone())
            } else if from_y {
                Ok(y.clone())
            } else {
                Ok(Slot::Branch(Arc::new(merged)))
            }
        }
        _ => panic!("leaf and branch cells at the same depth"),
    }
}
