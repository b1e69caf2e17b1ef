use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use log::debug;

use crate::{
    buffer::{
        frame::{Frame, FrameMeta, PinnedPage},
        BufferPool, LruReplacer,
    },
    storage::{disk_manager::DiskManager, log_manager::LogManager},
    types::{error::DatabaseError, FrameId, PageId},
};

struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    metas: Vec<FrameMeta>,
    next_page_id: PageId,
}

/// A fixed-size page cache over the disk manager.
///
/// One mutex guards the page table, free list and all frame metadata
/// for the whole of every public operation; disk I/O happens under it.
/// Page contents live in per-frame latches (see [`Frame`]) so index
/// code can read and write pages without holding the pool up.
///
/// When the instance is one shard of a larger pool it allocates page
/// ids striding by the shard count, so shard `k` of `n` only ever owns
/// ids congruent to `k` modulo `n`.
pub struct BufferPoolInstance {
    pool_size: usize,
    num_instances: u32,
    instance_index: u32,
    frames: Vec<Arc<Frame>>,
    replacer: LruReplacer,
    state: Mutex<PoolState>,
    disk_manager: Arc<DiskManager>,
    log_manager: Arc<LogManager>,
}

impl BufferPoolInstance {
    pub fn new(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
    ) -> Self {
        Self::for_shard(pool_size, 1, 0, disk_manager, log_manager)
    }

    pub fn for_shard(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
    ) -> Self {
        assert!(pool_size > 0, "buffer pool must hold at least one frame");
        assert!(num_instances > 0, "a pool has at least one instance");
        assert!(
            instance_index < num_instances,
            "shard index {} out of range for {} instances",
            instance_index,
            num_instances
        );

        let frames = (0..pool_size).map(|_| Arc::new(Frame::new())).collect();
        let metas = (0..pool_size).map(|_| FrameMeta::new()).collect();
        // Every frame starts on the free list.
        let free_list = (0..pool_size).collect();

        Self {
            pool_size,
            num_instances,
            instance_index,
            frames,
            replacer: LruReplacer::new(pool_size),
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                metas,
                next_page_id: instance_index as PageId,
            }),
            disk_manager,
            log_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.log_manager
    }

    /// Current pin count of a resident page. Test and introspection
    /// helper; the answer is stale the moment the lock drops.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock().unwrap();
        let frame_id = *state.page_table.get(&page_id)?;
        Some(state.metas[frame_id].pin_count)
    }

    pub fn new_page(&self) -> Result<PinnedPage<'_>, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let Some(frame_id) = self.acquire_frame(&mut state)? else {
            return Err(DatabaseError::BufferPoolExhausted);
        };

        let page_id = self.allocate_page(&mut state);
        let meta = &mut state.metas[frame_id];
        meta.page_id = page_id;
        meta.pin_count = 1;
        meta.is_dirty = false;
        state.page_table.insert(page_id, frame_id);
        self.frames[frame_id].data().write().unwrap().fill(0);

        Ok(PinnedPage::new(self, Arc::clone(&self.frames[frame_id]), page_id))
    }

    pub fn fetch_page(&self, page_id: PageId) -> Result<PinnedPage<'_>, DatabaseError> {
        if page_id < 0 {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            // Hit: the dirty flag is left alone; whoever modifies the
            // page says so at unpin time.
            self.replacer.pin(frame_id);
            state.metas[frame_id].pin_count += 1;
            return Ok(PinnedPage::new(self, Arc::clone(&self.frames[frame_id]), page_id));
        }

        let Some(frame_id) = self.acquire_frame(&mut state)? else {
            return Err(DatabaseError::BufferPoolExhausted);
        };

        {
            let mut data = self.frames[frame_id].data().write().unwrap();
            if let Err(e) = self.disk_manager.read_page(page_id, &mut data[..]) {
                drop(data);
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        }
        let meta = &mut state.metas[frame_id];
        meta.page_id = page_id;
        meta.pin_count = 1;
        meta.is_dirty = false;
        state.page_table.insert(page_id, frame_id);

        Ok(PinnedPage::new(self, Arc::clone(&self.frames[frame_id]), page_id))
    }

    /// Releases one pin. `is_dirty` is folded in with OR so a reader
    /// unpinning clean never clears a writer's earlier mark.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let meta = &mut state.metas[frame_id];
        if meta.pin_count == 0 {
            return false;
        }
        meta.is_dirty |= is_dirty;
        meta.pin_count -= 1;
        if meta.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        if state.metas[frame_id].is_dirty {
            let data = self.frames[frame_id].data().read().unwrap();
            self.disk_manager.write_page(page_id, &data[..])?;
        }
        state.metas[frame_id].is_dirty = false;
        Ok(true)
    }

    pub fn flush_all_pages(&self) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let resident: Vec<(PageId, FrameId)> =
            state.page_table.iter().map(|(&p, &f)| (p, f)).collect();
        for (page_id, frame_id) in resident {
            if state.metas[frame_id].is_dirty {
                let data = self.frames[frame_id].data().read().unwrap();
                self.disk_manager.write_page(page_id, &data[..])?;
            }
            state.metas[frame_id].is_dirty = false;
        }
        Ok(())
    }

    pub fn delete_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };
        if state.metas[frame_id].pin_count != 0 {
            return Ok(false);
        }

        state.page_table.remove(&page_id);
        // The frame sat in the replacer (pin count was zero); it must
        // not be handed out as a victim once it is back on the free
        // list.
        self.replacer.pin(frame_id);
        state.metas[frame_id].reset();
        self.frames[frame_id].data().write().unwrap().fill(0);
        state.free_list.push_back(frame_id);
        // Only a page actually removed from the pool is handed back to
        // the disk layer.
        self.disk_manager.deallocate_page(page_id);
        Ok(true)
    }

    /// Hands out a frame for a new occupant: free list first, then the
    /// replacer. A dirty victim is written back before the frame is
    /// reused. `Ok(None)` means every frame is pinned.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<Option<FrameId>, DatabaseError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.replacer.victim() else {
            return Ok(None);
        };
        let evicted = state.metas[frame_id].page_id;
        if state.metas[frame_id].is_dirty {
            let data = self.frames[frame_id].data().read().unwrap();
            if let Err(e) = self.disk_manager.write_page(evicted, &data[..]) {
                drop(data);
                self.replacer.unpin(frame_id);
                return Err(e);
            }
        }
        debug!("evicted page {} from frame {}", evicted, frame_id);
        state.page_table.remove(&evicted);
        state.metas[frame_id].is_dirty = false;
        Ok(Some(frame_id))
    }

    fn allocate_page(&self, state: &mut PoolState) -> PageId {
        let page_id = state.next_page_id;
        state.next_page_id += self.num_instances as PageId;
        debug_assert_eq!(
            page_id as u32 % self.num_instances,
            self.instance_index,
            "allocated page id must map back to this instance"
        );
        page_id
    }
}

impl BufferPool for BufferPoolInstance {
    fn new_page(&self) -> Result<PinnedPage<'_>, DatabaseError> {
        BufferPoolInstance::new_page(self)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<PinnedPage<'_>, DatabaseError> {
        BufferPoolInstance::fetch_page(self, page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        BufferPoolInstance::unpin_page(self, page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        BufferPoolInstance::flush_page(self, page_id)
    }

    fn flush_all_pages(&self) -> Result<(), DatabaseError> {
        BufferPoolInstance::flush_all_pages(self)
    }

    fn delete_page(&self, page_id: PageId) -> Result<bool, DatabaseError> {
        BufferPoolInstance::delete_page(self, page_id)
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}
