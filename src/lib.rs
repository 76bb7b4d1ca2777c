//! # `intmap` - Persistent sparse integer-keyed maps
//!
//! A persistent map from `u64` keys to values, built for workloads that
//! keep many nearby versions alive — the shape of dataflow analyses,
//! where thousands of program points each hold a slightly different
//! environment. Every update returns a new map sharing all untouched
//! structure with its input.
//!
//! ## Key features
//!
//! - **Structural sharing**: updates allocate `O(log n)` nodes; old
//!   versions stay valid and cheap to keep.
//! - **Transients**: a single-owner mutable view batches updates with
//!   in-place edits and seals back to a persistent map in O(1), using
//!   identity-compared edit tokens rather than per-node counters.
//! - **Windowed trie**: a 32-way branching trie that only materializes
//!   the levels a key cluster needs, so dense ranges stay shallow.
//! - **Set operations**: union and intersection reconcile windows and
//!   preserve sharing, returning an input's own subtree wherever the
//!   result matches it.
//!
//! ## Example
//!
//! ```rust
//! use intmap::IntMap;
//!
//! let live = IntMap::new().replace(10, "r1").replace(11, "r2");
//! let after_call = live.remove(10).replace(12, "r3");
//!
//! // both versions remain usable
//! assert_eq!(live.get(10), Some(&"r1"));
//! assert_eq!(after_call.get(10), None);
//!
//! // merge facts flowing in from two predecessors
//! let merged = live.union_with(&after_call, |a, _| *a);
//! assert_eq!(merged.len(), 3);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod edit;
mod error;
mod iter;
mod map;
mod node;
mod serde;
mod setops;
mod transient;

pub use error::Error;
pub use iter::Iter;
pub use map::IntMap;
pub use transient::TransientIntMap;

// Compile-time checks on the trie geometry and handle layout.
const _: () = {
    use core::mem;

    // Fan-out and window shifts must stay in lockstep.
    assert!(node::BRANCH_FACTOR == 1 << node::BRANCH_BITS);
    assert!(node::MAX_SHIFT % node::BRANCH_BITS == 0);
    assert!(node::MAX_SHIFT >= u64::BITS);
    assert!(node::MAX_SHIFT - node::BRANCH_BITS < u64::BITS);

    // A trie cell is a tag plus one payload word; the map handle adds
    // its window on top.
    assert!(mem::size_of::<node::Slot<u64>>() <= 2 * mem::size_of::<u64>());
    assert!(mem::size_of::<IntMap<u64>>() <= 4 * mem::size_of::<u64>());
};
