use std::sync::{Arc, Mutex};

use crate::{
    buffer::{frame::PinnedPage, BufferPool, BufferPoolInstance},
    storage::{disk_manager::DiskManager, log_manager::LogManager},
    types::{error::DatabaseError, PageId},
};

/// Routes pages across several [`BufferPoolInstance`]s by page id.
///
/// Each shard has its own latch, so operations on pages that land in
/// different shards never contend. Shard `k` allocates only page ids
/// congruent to `k`, which is what makes the routing function total:
/// `shard(page_id) = page_id mod num_shards`.
pub struct ShardedBufferPool {
    shards: Vec<BufferPoolInstance>,
    pool_size_per_shard: usize,
    // Round-robin starting point for the next allocation.
    alloc_cursor: Mutex<usize>,
}

impl ShardedBufferPool {
    pub fn new(
        num_shards: usize,
        pool_size_per_shard: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
    ) -> Self {
        assert!(num_shards > 0, "sharded pool needs at least one shard");
        let shards = (0..num_shards)
            .map(|i| {
                BufferPoolInstance::for_shard(
                    pool_size_per_shard,
                    num_shards as u32,
                    i as u32,
                    Arc::clone(&disk_manager),
                    Arc::clone(&log_manager),
                )
            })
            .collect();
        Self {
            shards,
            pool_size_per_shard,
            alloc_cursor: Mutex::new(0),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, page_id: PageId) -> &BufferPoolInstance {
        debug_assert!(page_id >= 0);
        &self.shards[page_id as usize % self.shards.len()]
    }
}

impl BufferPool for ShardedBufferPool {
    /// Tries each shard once, starting from the round-robin cursor. The
    /// cursor advances by exactly one per call, whether or not any
    /// shard had room.
    fn new_page(&self) -> Result<PinnedPage<'_>, DatabaseError> {
        let n = self.shards.len();
        let mut cursor = self.alloc_cursor.lock().unwrap();
        let start = *cursor;
        *cursor = (start + 1) % n;
        drop(cursor);

        for i in 0..n {
            match self.shards[(start + i) % n].new_page() {
                Ok(page) => return Ok(page),
                Err(DatabaseError::BufferPoolExhausted) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(DatabaseError::BufferPoolExhausted)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<PinnedPage<'_>, DatabaseError> {
        self.shard(page_id).fetch_page(page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.shard(page_id).unpin_page(page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        self.shard(page_id).flush_page(page_id)
    }

    fn flush_all_pages(&self) -> Result<(), DatabaseError> {
        for shard in &self.shards {
            shard.flush_all_pages()?;
        }
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        self.shard(page_id).delete_page(page_id)
    }

    fn pool_size(&self) -> usize {
        self.shards.len() * self.pool_size_per_shard
    }
}
