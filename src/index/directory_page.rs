use std::collections::HashMap;

use log::debug;

use crate::types::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// Upper bound on the global depth; the directory array is sized for it.
pub const DIRECTORY_MAX_DEPTH: u32 = 9;
pub const DIRECTORY_ARRAY_SIZE: usize = 1 << DIRECTORY_MAX_DEPTH;

/*
 * Directory Page Layout on Disk
 * ┌──────────────────────────────────────────────────────────────┐
 * │ global_depth (4)                                             │
 * ├──────────────────────────────────────────────────────────────┤
 * │ bucket_page_ids: i32 × 512 (2048)                            │
 * ├──────────────────────────────────────────────────────────────┤
 * │ local_depths: u8 × 512 (512)                                 │
 * ├──────────────────────────────────────────────────────────────┤
 * │ unused up to PAGE_SIZE                                       │
 * └──────────────────────────────────────────────────────────────┘
 */
const GLOBAL_DEPTH_OFFSET: usize = 0;
const BUCKET_PAGE_IDS_OFFSET: usize = 4;
const LOCAL_DEPTHS_OFFSET: usize = BUCKET_PAGE_IDS_OFFSET + 4 * DIRECTORY_ARRAY_SIZE;
pub const DIRECTORY_PAGE_DATA_SIZE: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

fn read_global_depth(data: &[u8]) -> u32 {
    u32::from_le_bytes([
        data[GLOBAL_DEPTH_OFFSET],
        data[GLOBAL_DEPTH_OFFSET + 1],
        data[GLOBAL_DEPTH_OFFSET + 2],
        data[GLOBAL_DEPTH_OFFSET + 3],
    ])
}

fn read_bucket_page_id(data: &[u8], idx: usize) -> PageId {
    let off = BUCKET_PAGE_IDS_OFFSET + 4 * idx;
    PageId::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn read_local_depth(data: &[u8], idx: usize) -> u32 {
    data[LOCAL_DEPTHS_OFFSET + idx] as u32
}

/// Read-only view of the hash directory stored in a buffer pool page.
///
/// The directory maps the low `global_depth` bits of a key hash to a
/// bucket page id and remembers, per slot, how many of those bits the
/// pointed-to bucket actually distinguishes (its local depth).
pub struct HashDirectoryPage<'a> {
    data: &'a [u8],
}

impl<'a> HashDirectoryPage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= DIRECTORY_PAGE_DATA_SIZE);
        Self { data }
    }

    pub fn global_depth(&self) -> u32 {
        read_global_depth(self.data)
    }

    pub fn global_depth_mask(&self) -> u32 {
        (1 << self.global_depth()) - 1
    }

    /// Number of live directory slots, always a power of two.
    pub fn size(&self) -> usize {
        1 << self.global_depth()
    }

    pub fn bucket_page_id(&self, idx: usize) -> PageId {
        debug_assert!(idx < DIRECTORY_ARRAY_SIZE);
        read_bucket_page_id(self.data, idx)
    }

    pub fn local_depth(&self, idx: usize) -> u32 {
        debug_assert!(idx < DIRECTORY_ARRAY_SIZE);
        read_local_depth(self.data, idx)
    }

    pub fn local_depth_mask(&self, idx: usize) -> u32 {
        (1 << self.local_depth(idx)) - 1
    }

    /// The slot that differs from `idx` in exactly the bit added by the
    /// latest local-depth increase. Meaningless at depth zero.
    pub fn split_image_index(&self, idx: usize) -> usize {
        let local_depth = self.local_depth(idx);
        debug_assert!(local_depth > 0, "bucket at depth 0 has no split image");
        idx ^ (1 << (local_depth - 1))
    }

    /// True when no bucket uses every global bit, so the top half of
    /// the directory mirrors the bottom half exactly.
    pub fn can_shrink(&self) -> bool {
        let global_depth = self.global_depth();
        (0..self.size()).all(|i| self.local_depth(i) < global_depth)
    }

    /// Asserts the directory invariants. Test hook; compiled-in asserts
    /// fire in debug builds only where callers use it that way.
    pub fn verify_integrity(&self) {
        let global_depth = self.global_depth();
        let size = self.size();
        let mut pointer_counts: HashMap<PageId, usize> = HashMap::new();
        let mut depths: HashMap<PageId, u32> = HashMap::new();

        for idx in 0..size {
            let local_depth = self.local_depth(idx);
            assert!(
                local_depth <= global_depth,
                "local depth {} exceeds global depth {} at slot {}",
                local_depth,
                global_depth,
                idx
            );

            let page_id = self.bucket_page_id(idx);
            assert_ne!(page_id, INVALID_PAGE_ID, "unset bucket page id at slot {}", idx);
            *pointer_counts.entry(page_id).or_insert(0) += 1;
            match depths.get(&page_id) {
                Some(&d) => assert_eq!(
                    d, local_depth,
                    "slots sharing bucket page {} disagree on local depth",
                    page_id
                ),
                None => {
                    depths.insert(page_id, local_depth);
                }
            }
        }

        for (page_id, count) in pointer_counts {
            let expected = 1usize << (global_depth - depths[&page_id]);
            assert_eq!(
                count, expected,
                "bucket page {} has {} pointers, expected {}",
                page_id, count, expected
            );
        }
    }

    /// Writes the directory table to the debug log.
    pub fn debug_dump(&self) {
        debug!(
            "directory: global_depth={} size={}",
            self.global_depth(),
            self.size()
        );
        for idx in 0..self.size() {
            debug!(
                "  slot {:3}: bucket_page_id={} local_depth={}",
                idx,
                self.bucket_page_id(idx),
                self.local_depth(idx)
            );
        }
    }
}

/// Mutable view of the hash directory.
pub struct HashDirectoryPageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HashDirectoryPageMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= DIRECTORY_PAGE_DATA_SIZE);
        Self { data }
    }

    fn as_read(&self) -> HashDirectoryPage<'_> {
        HashDirectoryPage::new(self.data)
    }

    pub fn global_depth(&self) -> u32 {
        self.as_read().global_depth()
    }

    pub fn global_depth_mask(&self) -> u32 {
        self.as_read().global_depth_mask()
    }

    pub fn size(&self) -> usize {
        self.as_read().size()
    }

    pub fn bucket_page_id(&self, idx: usize) -> PageId {
        self.as_read().bucket_page_id(idx)
    }

    pub fn local_depth(&self, idx: usize) -> u32 {
        self.as_read().local_depth(idx)
    }

    pub fn local_depth_mask(&self, idx: usize) -> u32 {
        self.as_read().local_depth_mask(idx)
    }

    pub fn split_image_index(&self, idx: usize) -> usize {
        self.as_read().split_image_index(idx)
    }

    pub fn can_shrink(&self) -> bool {
        self.as_read().can_shrink()
    }

    pub fn verify_integrity(&self) {
        self.as_read().verify_integrity()
    }

    /// Resets the directory to depth zero with every slot unset.
    pub fn init(&mut self) {
        self.set_global_depth(0);
        for idx in 0..DIRECTORY_ARRAY_SIZE {
            self.set_bucket_page_id(idx, INVALID_PAGE_ID);
            self.set_local_depth(idx, 0);
        }
    }

    fn set_global_depth(&mut self, depth: u32) {
        self.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
            .copy_from_slice(&depth.to_le_bytes());
    }

    /// Doubles the directory: the new upper half mirrors the lower half
    /// slot for slot, then the depth ticks up.
    pub fn incr_global_depth(&mut self) {
        let old_depth = self.global_depth();
        assert!(
            old_depth < DIRECTORY_MAX_DEPTH,
            "directory cannot grow past depth {}",
            DIRECTORY_MAX_DEPTH
        );
        let old_size = 1usize << old_depth;
        for idx in 0..old_size {
            let page_id = self.bucket_page_id(idx);
            let local_depth = self.local_depth(idx);
            self.set_bucket_page_id(old_size + idx, page_id);
            self.set_local_depth(old_size + idx, local_depth);
        }
        self.set_global_depth(old_depth + 1);
    }

    pub fn decr_global_depth(&mut self) {
        let depth = self.global_depth();
        assert!(depth > 0, "directory is already at depth 0");
        self.set_global_depth(depth - 1);
    }

    pub fn set_bucket_page_id(&mut self, idx: usize, page_id: PageId) {
        debug_assert!(idx < DIRECTORY_ARRAY_SIZE);
        let off = BUCKET_PAGE_IDS_OFFSET + 4 * idx;
        self.data[off..off + 4].copy_from_slice(&page_id.to_le_bytes());
    }

    pub fn set_local_depth(&mut self, idx: usize, depth: u32) {
        debug_assert!(idx < DIRECTORY_ARRAY_SIZE);
        debug_assert!(depth <= DIRECTORY_MAX_DEPTH);
        self.data[LOCAL_DEPTHS_OFFSET + idx] = depth as u8;
    }

    pub fn incr_local_depth(&mut self, idx: usize) {
        let depth = self.local_depth(idx);
        self.set_local_depth(idx, depth + 1);
    }

    pub fn decr_local_depth(&mut self, idx: usize) {
        let depth = self.local_depth(idx);
        debug_assert!(depth > 0);
        self.set_local_depth(idx, depth - 1);
    }
}

const _: () = assert!(DIRECTORY_PAGE_DATA_SIZE <= PAGE_SIZE);
