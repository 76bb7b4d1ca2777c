//! Ascending iteration over map bindings.

use crate::error::infallible;
use crate::map::IntMap;
use crate::node::{Branch, Slot, BRANCH_BITS, BRANCH_FACTOR};
use crate::transient::TransientIntMap;

/// Iterator over the bindings of an [`IntMap`] in ascending key order.
pub struct Iter<'a, V> {
    // (branch, window base, child shift, next child index)
    stack: Vec<(&'a Branch<V>, u64, u32, usize)>,
    singleton: Option<(u64, &'a V)>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(map: &'a IntMap<V>) -> Self {
        let mut iter = Iter {
            stack: Vec::new(),
            singleton: None,
        };
        match &map.root {
            Slot::Absent => {}
            Slot::Leaf(v) => iter.singleton = Some((map.min, v)),
            Slot::Branch(b) => iter.stack.push((b, map.min, map.shift - BRANCH_BITS, 0)),
        }
        iter
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(binding) = self.singleton.take() {
            return Some(binding);
        }
        loop {
            let (branch, base, cs, pos) = *self.stack.last()?;
            if pos == BRANCH_FACTOR {
                self.stack.pop();
                continue;
            }
            if let Some(top) = self.stack.last_mut() {
                top.3 = pos + 1;
            }
            let child_base = base + ((pos as u64) << cs);
            match &branch.children[pos] {
                Slot::Absent => {}
                Slot::Leaf(v) => return Some((child_base, v)),
                Slot::Branch(b) => self.stack.push((b, child_base, cs - BRANCH_BITS, 0)),
            }
        }
    }
}

impl<'a, V> IntoIterator for &'a IntMap<V> {
    type Item = (u64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Clone + PartialEq> FromIterator<(u64, V)> for IntMap<V> {
    /// Builds through a transient; a later binding for a key wins.
    fn from_iter<T: IntoIterator<Item = (u64, V)>>(pairs: T) -> Self {
        let mut staged = TransientIntMap::new();
        for (key, value) in pairs {
            infallible(staged.adjoin_in_place(key, value, &mut |_, _, new| Ok(new.clone())));
        }
        infallible(staged.persistent())
    }
}
