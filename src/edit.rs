//! Runtime ownership cells for transient maps.
//!
//! A transient and every node it allocates share one [`EditCell`]. The
//! cell is the mutation capability: a node may be written in place only
//! while its token is the *same cell* (by `Arc` identity) as the
//! transient's. Sealing a transient retires its cell and hands the
//! transient a fresh one, so nodes published into a persistent map can
//! never match a live token again — no tree walk required.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use crossbeam_utils::atomic::AtomicCell;

/// One-shot ownership cell.
///
/// Records the thread that may operate on the owning transient. The
/// content is only consulted for the handle-level ownership check; node
/// writability is decided purely by cell identity.
pub(crate) struct EditCell {
    owner: AtomicCell<Option<ThreadId>>,
}

impl EditCell {
    /// A live cell owned by the calling thread.
    pub(crate) fn new() -> Self {
        EditCell {
            owner: AtomicCell::new(Some(thread::current().id())),
        }
    }

    /// Whether the calling thread currently owns this cell.
    #[inline]
    pub(crate) fn owned_by_caller(&self) -> bool {
        self.owner.load() == Some(thread::current().id())
    }

    /// Gives up ownership for good; every node stamped with this cell is
    /// frozen from here on.
    pub(crate) fn retire(&self) {
        self.owner.store(None);
    }
}

/// Whether `token` authorizes in-place mutation under `edit`.
#[inline]
pub(crate) fn writable(token: &Option<Arc<EditCell>>, edit: &Arc<EditCell>) -> bool {
    token.as_ref().is_some_and(|t| Arc::ptr_eq(t, edit))
}
