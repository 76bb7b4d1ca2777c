//! The persistent map surface.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::error::{infallible, Error};
use crate::iter::Iter;
use crate::node::{self, Branch, Slot, BRANCH_BITS, MAX_SHIFT};
use crate::transient::TransientIntMap;

/// An immutable sparse map from `u64` keys to values.
///
/// Every mutating operation returns a new map that shares all untouched
/// subtrees with its input, so keeping many nearby versions alive — the
/// dominant access pattern in dataflow fixpoints — costs `O(log n)`
/// fresh nodes per step rather than a copy.
///
/// Cloning is `O(1)` and bindings added to one version are invisible to
/// every other:
///
/// ```
/// use intmap::IntMap;
///
/// let a = IntMap::new().replace(1, "one").replace(2, "two");
/// let b = a.replace(3, "three");
/// assert_eq!(b.get(3), Some(&"three"));
/// assert_eq!(a.get(3), None);
/// ```
///
/// For bursts of updates, [`IntMap::transient`] yields a single-owner
/// mutable view that edits nodes in place and seals back into a
/// persistent map in `O(1)`.
pub struct IntMap<V> {
    pub(crate) min: u64,
    pub(crate) shift: u32,
    pub(crate) root: Slot<V>,
}

impl<V> IntMap<V> {
    /// The empty map. Allocates nothing, so every empty map is
    /// canonically identical.
    pub fn new() -> Self {
        IntMap {
            min: 0,
            shift: 0,
            root: Slot::Absent,
        }
    }

    /// Whether the map holds no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.root, Slot::Absent)
    }

    /// The value bound to `key`, if any. O(log n); allocates nothing.
    #[inline]
    pub fn get(&self, key: u64) -> Option<&V> {
        node::lookup(&self.root, self.min, self.shift, key)
    }

    /// Whether `key` is bound.
    pub fn contains_key(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// The smallest bound key.
    pub fn min_key(&self) -> Option<u64> {
        node::next_key(&self.root, self.min, self.shift, None)
    }

    /// The largest bound key.
    pub fn max_key(&self) -> Option<u64> {
        node::prev_key(&self.root, self.min, self.shift, None)
    }

    /// The smallest bound key strictly greater than `key`.
    ///
    /// Amortized O(1) when called with monotonically increasing keys,
    /// O(log n) worst case.
    pub fn next_key(&self, key: u64) -> Option<u64> {
        node::next_key(&self.root, self.min, self.shift, Some(key))
    }

    /// The largest bound key strictly less than `key`.
    pub fn prev_key(&self, key: u64) -> Option<u64> {
        node::prev_key(&self.root, self.min, self.shift, Some(key))
    }

    /// Folds `f` over every binding in ascending key order.
    pub fn fold<B, F>(&self, seed: B, mut f: F) -> B
    where
        F: FnMut(u64, &V, B) -> B,
    {
        node::fold(&self.root, self.min, self.shift, seed, &mut f)
    }

    /// Number of bindings, counted by walking the trie. O(n).
    pub fn len(&self) -> usize {
        self.fold(0, |_, _, n| n + 1)
    }

    /// Iterates over `(key, &value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self)
    }
}

impl<V: PartialEq> IntMap<V> {
    /// Whether two maps share their root, i.e. are the same version.
    ///
    /// This is the cheap identity check: maps that merely hold equal
    /// bindings compare `false` here but `true` under `==`. Branches
    /// compare by pointer; a shift-0 singleton root falls back to value
    /// equality.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.min == other.min
            && self.shift == other.shift
            && node::slot_shares(&self.root, &other.root)
    }
}

impl<V: Clone> IntMap<V> {
    /// A single-owner mutable view of this map, pinned to the calling
    /// thread. The view shares this map's nodes and copies each on first
    /// write.
    pub fn transient(&self) -> TransientIntMap<V> {
        TransientIntMap::with_parts(self.min, self.shift, self.root.clone())
    }

    /// A copy of this map without `key`. Removing an unbound key returns
    /// the same version (`ptr_eq` holds).
    ///
    /// The result's window is collapsed to its support: either the map
    /// is a singleton, or its root keeps at least two occupied slots.
    pub fn remove(&self, key: u64) -> Self {
        if !node::window_contains(self.min, self.shift, key) {
            return self.clone();
        }
        match remove_slot(&self.root, self.min, self.shift, key) {
            None => self.clone(),
            Some(Slot::Absent) => IntMap::new(),
            Some(root) => prune(self.min, self.shift, root),
        }
    }

    /// Wraps the root one level deeper, widening the window.
    pub(crate) fn grow(&self) -> Self {
        let parent_shift = self.shift + BRANCH_BITS;
        debug_assert!(parent_shift <= MAX_SHIFT);
        let min = node::round_down(self.min, parent_shift);
        let d = node::digit(self.min - min, self.shift);
        let mut branch = Branch::new(None);
        branch.children[d] = self.root.clone();
        IntMap {
            min,
            shift: parent_shift,
            root: Slot::Branch(Arc::new(branch)),
        }
    }
}

impl<V: Clone + PartialEq> IntMap<V> {
    /// A copy of this map with `key` bound to `value`.
    ///
    /// Inserting a value equal to the existing binding returns the same
    /// version (`ptr_eq` holds).
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingValues`] when `key` is already bound to a
    /// different value; use [`IntMap::insert_with`] or
    /// [`IntMap::replace`] to resolve collisions.
    pub fn insert(&self, key: u64, value: V) -> Result<Self, Error> {
        self.adjoin(key, value, &mut |k, _, _| Err(Error::ConflictingValues(k)))
    }

    /// A copy of this map with `key` bound to `value`, resolving a
    /// collision with `meet(existing, incoming)`.
    pub fn insert_with<F>(&self, key: u64, value: V, mut meet: F) -> Self
    where
        F: FnMut(&V, &V) -> V,
    {
        infallible(self.adjoin(key, value, &mut |_, old, new| Ok(meet(old, new))))
    }

    /// A copy of this map with `key` bound to `value`, discarding any
    /// existing binding.
    pub fn replace(&self, key: u64, value: V) -> Self {
        self.insert_with(key, value, |_, new| new.clone())
    }

    fn adjoin<M>(&self, key: u64, value: V, meet: &mut M) -> Result<Self, Error>
    where
        M: FnMut(u64, &V, &V) -> Result<V, Error>,
    {
        if self.is_empty() {
            return Ok(IntMap {
                min: key,
                shift: 0,
                root: Slot::Leaf(value),
            });
        }
        if node::window_contains(self.min, self.shift, key) {
            return Ok(
                match adjoin_slot(&self.root, self.min, self.shift, key, value, meet)? {
                    None => self.clone(),
                    Some(root) => IntMap {
                        min: self.min,
                        shift: self.shift,
                        root,
                    },
                },
            );
        }
        if key < self.min {
            // rebuild by merging a singleton below our window; the two
            // windows are disjoint, so the merge can never reach a leaf
            // collision
            let single = IntMap {
                min: key,
                shift: 0,
                root: Slot::Leaf(value),
            };
            return crate::setops::union_maps(&single, self, &mut |k, _: &V, _: &V| {
                panic!("key {k} below the root window is already bound")
            });
        }
        let mut grown = self.grow();
        while !node::window_contains(grown.min, grown.shift, key) {
            grown = grown.grow();
        }
        grown.adjoin(key, value, meet)
    }

    /// A map holding every binding of `self` and `other`.
    ///
    /// Keys bound on one side survive unchanged; `union(m, empty)`
    /// returns `m` itself.
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingValues`] when a key is bound on both sides
    /// with differing values; use [`IntMap::union_with`] to resolve.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        crate::setops::union_maps(self, other, &mut |k, _, _| Err(Error::ConflictingValues(k)))
    }

    /// A map holding every binding of `self` and `other`, resolving keys
    /// bound on both sides with `meet(ours, theirs)`.
    pub fn union_with<F>(&self, other: &Self, mut meet: F) -> Self
    where
        F: FnMut(&V, &V) -> V,
    {
        infallible(crate::setops::union_maps(self, other, &mut |_, a, b| {
            Ok(meet(a, b))
        }))
    }

    /// A map holding the keys bound in both `self` and `other`.
    ///
    /// Keys bound to equal values keep them; `intersect(m, m)` returns
    /// `m` itself, and disjoint maps yield the canonical empty map.
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingValues`] when a shared key is bound to
    /// differing values; use [`IntMap::intersect_with`] to resolve.
    pub fn intersect(&self, other: &Self) -> Result<Self, Error> {
        crate::setops::intersect_maps(self, other, &mut |k, _, _| {
            Err(Error::ConflictingValues(k))
        })
    }

    /// A map holding the keys bound in both `self` and `other`, with
    /// values resolved by `meet(ours, theirs)`.
    pub fn intersect_with<F>(&self, other: &Self, mut meet: F) -> Self
    where
        F: FnMut(&V, &V) -> V,
    {
        infallible(crate::setops::intersect_maps(self, other, &mut |_, a, b| {
            Ok(meet(a, b))
        }))
    }
}

fn adjoin_slot<V, M>(
    slot: &Slot<V>,
    base: u64,
    shift: u32,
    key: u64,
    value: V,
    meet: &mut M,
) -> Result<Option<Slot<V>>, Error>
where
    V: Clone + PartialEq,
    M: FnMut(u64, &V, &V) -> Result<V, Error>,
{
    if shift == 0 {
        return Ok(match slot {
            Slot::Absent => Some(Slot::Leaf(value)),
            Slot::Leaf(old) => {
                if *old == value {
                    None
                } else {
                    let merged = meet(key, old, &value)?;
                    if merged == *old {
                        None
                    } else {
                        Some(Slot::Leaf(merged))
                    }
                }
            }
            Slot::Branch(_) => panic!("branch cell at leaf depth"),
        });
    }
    let cs = shift - BRANCH_BITS;
    match slot {
        Slot::Absent => Ok(Some(node::chain(key, value, base, shift, None))),
        Slot::Leaf(_) => panic!("leaf cell above leaf depth"),
        Slot::Branch(b) => {
            let d = node::digit(key - base, cs);
            let child_base = base + ((d as u64) << cs);
            match adjoin_slot(&b.children[d], child_base, cs, key, value, meet)? {
                // untouched child, untouched branch: keep sharing
                None => Ok(None),
                Some(child) => {
                    let mut updated = b.clone_with_edit(None);
                    updated.children[d] = child;
                    Ok(Some(Slot::Branch(Arc::new(updated))))
                }
            }
        }
    }
}

/// `None` when `key` is unbound (no change); `Some(new_root)` otherwise,
/// collapsing branches left without occupants to `Absent`.
fn remove_slot<V: Clone>(slot: &Slot<V>, base: u64, shift: u32, key: u64) -> Option<Slot<V>> {
    if shift == 0 {
        return match slot {
            Slot::Absent => None,
            Slot::Leaf(_) => Some(Slot::Absent),
            Slot::Branch(_) => panic!("branch cell at leaf depth"),
        };
    }
    let cs = shift - BRANCH_BITS;
    match slot {
        Slot::Absent => None,
        Slot::Leaf(_) => panic!("leaf cell above leaf depth"),
        Slot::Branch(b) => {
            let d = node::digit(key - base, cs);
            let child = remove_slot(&b.children[d], base + ((d as u64) << cs), cs, key)?;
            let emptied = matches!(child, Slot::Absent)
                && !b
                    .children
                    .iter()
                    .enumerate()
                    .any(|(i, c)| i != d && !matches!(c, Slot::Absent));
            if emptied {
                return Some(Slot::Absent);
            }
            let mut updated = b.clone_with_edit(None);
            updated.children[d] = child;
            Some(Slot::Branch(Arc::new(updated)))
        }
    }
}

/// Collapses redundant upper levels until the window matches the map's
/// support: afterwards either `shift == 0`, or the root branch keeps at
/// least two occupied slots. A one-element result always ends at shift 0
/// with the value as its root.
pub(crate) fn prune<V: Clone>(mut min: u64, mut shift: u32, mut root: Slot<V>) -> IntMap<V> {
    while shift > 0 {
        let branch = match root {
            Slot::Absent => return IntMap::new(),
            Slot::Leaf(_) => panic!("leaf cell above leaf depth"),
            Slot::Branch(b) => b,
        };
        let mut occupied = branch
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Slot::Absent));
        match (occupied.next(), occupied.next()) {
            (None, _) => return IntMap::new(),
            (Some((d, _)), None) => {
                let cs = shift - BRANCH_BITS;
                min += (d as u64) << cs;
                shift = cs;
                root = branch.children[d].clone();
            }
            (Some(_), Some(_)) => {
                return IntMap {
                    min,
                    shift,
                    root: Slot::Branch(branch),
                }
            }
        }
    }
    IntMap { min, shift, root }
}

impl<V> Default for IntMap<V> {
    fn default() -> Self {
        IntMap::new()
    }
}

impl<V: Clone> Clone for IntMap<V> {
    fn clone(&self) -> Self {
        IntMap {
            min: self.min,
            shift: self.shift,
            root: self.root.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for IntMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for IntMap<V> {
    /// Structural equality: the same keys bound to equal values.
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for IntMap<V> {}

impl<V> Index<u64> for IntMap<V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics when `key` is not bound; use [`IntMap::get`] for a
    /// fallible lookup.
    fn index(&self, key: u64) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key {key} is not bound"),
        }
    }
}

#[cfg(feature = "proptest")]
impl<V> proptest::arbitrary::Arbitrary for IntMap<V>
where
    V: proptest::arbitrary::Arbitrary + Clone + PartialEq + 'static,
{
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::any;
        use proptest::strategy::Strategy;

        proptest::collection::vec((any::<u64>(), any::<V>()), 0..64)
            .prop_map(|pairs| pairs.into_iter().collect())
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of<V>(map: &IntMap<V>) -> (u64, u32) {
        (map.min, map.shift)
    }

    #[test]
    fn empty_map_is_canonical() {
        let empty: IntMap<u32> = IntMap::new();
        assert!(empty.is_empty());
        assert_eq!(window_of(&empty), (0, 0));
        assert!(empty.ptr_eq(&IntMap::new()));
    }

    #[test]
    fn singleton_keeps_shift_zero() {
        let map = IntMap::new().replace(100, 'x');
        assert_eq!(window_of(&map), (100, 0));
        assert_eq!(map.get(100), Some(&'x'));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn growth_rounds_the_base_down() {
        let map = IntMap::new().replace(100, 'x').replace(150, 'y');
        // 100 and 150 first share a window at shift 10
        assert_eq!(window_of(&map), (0, 10));
        assert_eq!(map.get(100), Some(&'x'));
        assert_eq!(map.get(150), Some(&'y'));
    }

    #[test]
    fn insert_below_the_window_rebuilds() {
        let first = IntMap::new().replace(100, 'x');
        let both = first.replace(50, 'y');
        assert_eq!(both.get(100), Some(&'x'));
        assert_eq!(both.get(50), Some(&'y'));
        // the original version is untouched
        assert_eq!(first.get(50), None);
        assert_eq!(first.get(100), Some(&'x'));
    }

    #[test]
    fn full_word_keys_are_addressable() {
        let map = IntMap::new().replace(0, 'a').replace(u64::MAX, 'z');
        assert_eq!(map.get(0), Some(&'a'));
        assert_eq!(map.get(u64::MAX), Some(&'z'));
        assert_eq!(map.next_key(0), Some(u64::MAX));
        assert_eq!(map.prev_key(u64::MAX), Some(0));
        assert_eq!(map.next_key(u64::MAX), None);
    }

    #[test]
    fn remove_collapses_the_window_to_the_support() {
        let map = IntMap::new().replace(0, 'a').replace(1, 'b').replace(1024, 'c');
        let narrowed = map.remove(1024);
        // dropping the far key collapses back to the dense cluster
        assert_eq!(window_of(&narrowed), (0, 5));
        let singleton = narrowed.remove(1);
        assert_eq!(window_of(&singleton), (0, 0));
        assert_eq!(singleton.get(0), Some(&'a'));
    }

    #[test]
    fn remove_of_last_binding_yields_the_canonical_empty() {
        let map = IntMap::new().replace(77, 'x');
        let emptied = map.remove(77);
        assert!(emptied.ptr_eq(&IntMap::new()));
    }

    #[test]
    fn remove_of_unbound_key_returns_the_same_version() {
        let map = IntMap::new().replace(5, 'x').replace(6, 'y');
        assert!(map.remove(7).ptr_eq(&map));
        assert!(map.remove(1 << 40).ptr_eq(&map));
    }

    #[test]
    fn reinserting_an_equal_value_returns_the_same_version() {
        let map = IntMap::new().replace(5, "a");
        let again = map.insert(5, "a").unwrap();
        assert!(again.ptr_eq(&map));
        let via_meet = map.insert_with(5, "b", |old, _| *old);
        assert!(via_meet.ptr_eq(&map));
    }

    #[test]
    fn insert_conflict_reports_the_key() {
        let map = IntMap::new().replace(5, "a");
        assert_eq!(map.insert(5, "b"), Err(Error::ConflictingValues(5)));
    }

    #[test]
    #[should_panic(expected = "not bound")]
    fn index_panics_on_unbound_keys() {
        let map = IntMap::new().replace(1, 'x');
        assert_eq!(map[1], 'x');
        let _ = map[2];
    }

    #[test]
    fn fold_visits_keys_in_ascending_order() {
        let map = IntMap::new()
            .replace(1024, 'e')
            .replace(0, 'a')
            .replace(32, 'c')
            .replace(1, 'b')
            .replace(1023, 'd');
        let keys = map.fold(Vec::new(), |k, _, mut acc| {
            acc.push(k);
            acc
        });
        assert_eq!(keys, vec![0, 1, 32, 1023, 1024]);
    }
}
