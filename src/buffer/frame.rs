use std::{
    cell::Cell,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    buffer::pool_instance::BufferPoolInstance,
    types::{PageId, INVALID_PAGE_ID, PAGE_SIZE},
};

/// Bookkeeping for one frame. Lives inside the owning pool's state
/// mutex, never accessed without it.
#[derive(Debug)]
pub(crate) struct FrameMeta {
    pub page_id: PageId,
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl FrameMeta {
    pub(crate) fn new() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

/// One slot of the buffer pool. The `RwLock` doubles as the per-page
/// reader/writer latch: index code takes it shared to scan a bucket and
/// exclusive to modify one, independent of the pool's own mutex.
pub struct Frame {
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub(crate) fn data(&self) -> &RwLock<Box<[u8; PAGE_SIZE]>> {
        &self.data
    }
}

/// A pinned page, returned by `new_page`/`fetch_page`.
///
/// Holding one keeps the page resident. Dropping it releases exactly one
/// pin, so every exit path of a caller is balanced without manual unpin
/// calls. Taking the write latch marks the page dirty; the flag is
/// handed to `unpin_page` on drop.
pub struct PinnedPage<'a> {
    pool: &'a BufferPoolInstance,
    frame: Arc<Frame>,
    page_id: PageId,
    dirty: Cell<bool>,
}

impl<'a> PinnedPage<'a> {
    pub(crate) fn new(pool: &'a BufferPoolInstance, frame: Arc<Frame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
            dirty: Cell::new(false),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Shared latch over the page bytes.
    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.data().read().unwrap()
    }

    /// Exclusive latch over the page bytes. The page will be unpinned
    /// dirty even if the caller ends up not changing anything.
    pub fn write(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.dirty.set(true);
        self.frame.data().write().unwrap()
    }
}

impl Drop for PinnedPage<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty.get());
    }
}
