pub mod frame;
pub mod lru_replacer;
pub mod pool_instance;
pub mod sharded_pool;

pub use frame::PinnedPage;
pub use lru_replacer::LruReplacer;
pub use pool_instance::BufferPoolInstance;
pub use sharded_pool::ShardedBufferPool;

use crate::types::{error::DatabaseError, PageId};

/// The buffer pool interface the rest of the engine programs against.
///
/// Implemented by the single-latch [`BufferPoolInstance`] and by
/// [`ShardedBufferPool`], which routes page ids across several
/// instances. Consumers (the hash index) hold an `Arc<dyn BufferPool>`
/// and never see which variant backs it.
pub trait BufferPool: Send + Sync {
    /// Allocates a fresh zeroed page, pinned once. Fails with
    /// [`DatabaseError::BufferPoolExhausted`] when every frame is pinned.
    fn new_page(&self) -> Result<PinnedPage<'_>, DatabaseError>;

    /// Returns the page pinned, reading it from disk on a miss.
    fn fetch_page(&self, page_id: PageId) -> Result<PinnedPage<'_>, DatabaseError>;

    /// Drops one pin, folding `is_dirty` into the page's dirty flag.
    /// Returns false if the page is not resident or was not pinned.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    /// Writes the page back if dirty and clears the flag. Returns false
    /// for pages that are not resident. Pin state is unchanged.
    fn flush_page(&self, page_id: PageId) -> Result<bool, DatabaseError>;

    fn flush_all_pages(&self) -> Result<(), DatabaseError>;

    /// Removes a resident, unpinned page and returns its frame to the
    /// free list. True when the page is gone (including "never here"),
    /// false while someone still holds a pin.
    fn delete_page(&self, page_id: PageId) -> Result<bool, DatabaseError>;

    fn pool_size(&self) -> usize;
}
