use std::{
    marker::PhantomData,
    sync::{Arc, RwLock},
};

use log::{debug, warn};

use crate::{
    buffer::BufferPool,
    index::{
        bucket_page::{HashBucketPage, HashBucketPageMut},
        directory_page::{HashDirectoryPage, HashDirectoryPageMut, DIRECTORY_MAX_DEPTH},
        key::{FixedKey, FixedValue, KeyComparator, KeyHasher},
    },
    types::{error::DatabaseError, PageId, Transaction},
};

/// Disk-backed extendible hash index.
///
/// All state lives in buffer pool pages: one directory page plus one
/// page per bucket. Concurrency is two-level. A table latch taken
/// shared by lookups, fast-path inserts and removes, exclusive by
/// structural changes (split, merge); under it, the bucket frame's own
/// latch guards the bytes being read or rewritten. Page latches are
/// always released before the table latch, and every fetched page is
/// unpinned by its guard on every path out.
pub struct ExtendibleHashTable<K, V, C, H> {
    directory_page_id: PageId,
    buffer_pool: Arc<dyn BufferPool>,
    comparator: C,
    hasher: H,
    table_latch: RwLock<()>,
    _marker: PhantomData<fn(K, V)>,
}

impl<K, V, C, H> ExtendibleHashTable<K, V, C, H>
where
    K: FixedKey,
    V: FixedValue,
    C: KeyComparator<K>,
    H: KeyHasher<K>,
{
    /// Bootstraps the index: a directory at depth zero whose single
    /// slot points at one empty bucket.
    pub fn new(
        buffer_pool: Arc<dyn BufferPool>,
        comparator: C,
        hasher: H,
    ) -> Result<Self, DatabaseError> {
        let directory_page_id;
        {
            let directory_page = buffer_pool.new_page()?;
            directory_page_id = directory_page.page_id();
            let bucket_page = buffer_pool.new_page()?;

            let mut data = directory_page.write();
            let mut directory = HashDirectoryPageMut::new(&mut data[..]);
            directory.init();
            directory.set_bucket_page_id(0, bucket_page.page_id());
            // A zeroed page already is an empty bucket; it goes back
            // clean.
        }

        Ok(Self {
            directory_page_id,
            buffer_pool,
            comparator,
            hasher,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    /// Low 32 bits of the key hash; the directory masks these further.
    fn hash(&self, key: &K) -> u32 {
        self.hasher.hash_key(key)
    }

    fn key_to_index(&self, key: &K, directory: &HashDirectoryPage<'_>) -> usize {
        (self.hash(key) & directory.global_depth_mask()) as usize
    }

    /// Collects every value stored under `key`.
    pub fn get_value(&self, _txn: &Transaction, key: &K) -> Result<Vec<V>, DatabaseError> {
        let _table = self.table_latch.read().unwrap();
        let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let bucket_page_id = {
            let data = directory_page.read();
            let directory = HashDirectoryPage::new(&data[..]);
            directory.bucket_page_id(self.key_to_index(key, &directory))
        };

        let bucket_page = self.buffer_pool.fetch_page(bucket_page_id)?;
        let values = {
            let data = bucket_page.read();
            HashBucketPage::<K, V>::new(&data[..]).get_all(key, &self.comparator)
        };
        Ok(values)
    }

    /// Inserts the pair, splitting the target bucket if it is full.
    /// Returns false for an exact duplicate.
    pub fn insert(&self, _txn: &Transaction, key: &K, value: &V) -> Result<bool, DatabaseError> {
        let full;
        let inserted;
        {
            let _table = self.table_latch.read().unwrap();
            let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
            let bucket_page_id = {
                let data = directory_page.read();
                let directory = HashDirectoryPage::new(&data[..]);
                directory.bucket_page_id(self.key_to_index(key, &directory))
            };

            let bucket_page = self.buffer_pool.fetch_page(bucket_page_id)?;
            let mut data = bucket_page.write();
            let mut bucket = HashBucketPageMut::<K, V>::new(&mut data[..]);
            full = bucket.is_full();
            inserted = if full {
                false
            } else {
                bucket.insert(key, value, &self.comparator)
            };
        }
        // Everything is unlatched and unpinned before promoting to the
        // exclusive path.
        if full {
            return self.split_insert(key, value);
        }
        Ok(inserted)
    }

    /// Exclusive insert path for a full bucket. The fullness check runs
    /// again under the write latch; another writer may have drained or
    /// split the bucket since the fast path gave up.
    fn split_insert(&self, key: &K, value: &V) -> Result<bool, DatabaseError> {
        let _table = self.table_latch.write().unwrap();
        let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let (bucket_idx, bucket_page_id, local_depth, global_depth) = {
            let data = directory_page.read();
            let directory = HashDirectoryPage::new(&data[..]);
            let idx = self.key_to_index(key, &directory);
            (
                idx,
                directory.bucket_page_id(idx),
                directory.local_depth(idx),
                directory.global_depth(),
            )
        };

        let bucket_page = self.buffer_pool.fetch_page(bucket_page_id)?;
        {
            let mut data = bucket_page.write();
            let mut bucket = HashBucketPageMut::<K, V>::new(&mut data[..]);
            if !bucket.is_full() {
                return Ok(bucket.insert(key, value, &self.comparator));
            }
        }

        if local_depth == global_depth && global_depth >= DIRECTORY_MAX_DEPTH {
            warn!(
                "bucket page {} is full at max directory depth; insert rejected",
                bucket_page_id
            );
            return Ok(false);
        }

        let mut directory_data = directory_page.write();
        let mut directory = HashDirectoryPageMut::new(&mut directory_data[..]);
        if directory.local_depth(bucket_idx) == directory.global_depth() {
            directory.incr_global_depth();
        }

        let new_bucket_page = self.buffer_pool.new_page()?;
        let new_bucket_page_id = new_bucket_page.page_id();

        directory.incr_local_depth(bucket_idx);
        let new_local_depth = directory.local_depth(bucket_idx);
        let split_idx = directory.split_image_index(bucket_idx);
        let mask = directory.local_depth_mask(bucket_idx);
        debug!(
            "splitting bucket page {} (slot {}) into page {} at local depth {}",
            bucket_page_id, bucket_idx, new_bucket_page_id, new_local_depth
        );

        // Every alias of the old bucket adopts the new depth; the ones
        // on the far side of the new bit move to the new page.
        for idx in 0..directory.size() {
            if directory.bucket_page_id(idx) == bucket_page_id {
                directory.set_local_depth(idx, new_local_depth);
                if (idx as u32 & mask) != (bucket_idx as u32 & mask) {
                    directory.set_bucket_page_id(idx, new_bucket_page_id);
                }
            }
        }

        let mut old_data = bucket_page.write();
        let mut old_bucket = HashBucketPageMut::<K, V>::new(&mut old_data[..]);
        let mut new_data = new_bucket_page.write();
        let mut new_bucket = HashBucketPageMut::<K, V>::new(&mut new_data[..]);

        for idx in 0..HashBucketPageMut::<K, V>::capacity() {
            if !old_bucket.is_readable(idx) {
                continue;
            }
            let slot_key = old_bucket.key_at(idx);
            let slot_value = old_bucket.value_at(idx);
            let new_idx = (self.hash(&slot_key) & directory.global_depth_mask()) as usize;
            if new_idx == split_idx {
                old_bucket.remove_at(idx);
                new_bucket.insert(&slot_key, &slot_value, &self.comparator);
            }
        }

        let target_idx = (self.hash(key) & directory.global_depth_mask()) as usize;
        let done = if directory.bucket_page_id(target_idx) == bucket_page_id {
            old_bucket.insert(key, value, &self.comparator)
        } else {
            new_bucket.insert(key, value, &self.comparator)
        };
        Ok(done)
    }

    /// Removes the pair. An emptied bucket triggers an advisory merge
    /// with its split image.
    pub fn remove(&self, _txn: &Transaction, key: &K, value: &V) -> Result<bool, DatabaseError> {
        let removed;
        let remaining;
        {
            let _table = self.table_latch.read().unwrap();
            let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
            let bucket_page_id = {
                let data = directory_page.read();
                let directory = HashDirectoryPage::new(&data[..]);
                directory.bucket_page_id(self.key_to_index(key, &directory))
            };

            let bucket_page = self.buffer_pool.fetch_page(bucket_page_id)?;
            let mut data = bucket_page.write();
            let mut bucket = HashBucketPageMut::<K, V>::new(&mut data[..]);
            removed = bucket.remove(key, value, &self.comparator);
            remaining = bucket.num_readable();
        }
        if remaining == 0 {
            self.merge(key)?;
        }
        Ok(removed)
    }

    /// Folds an empty bucket into its split image and shrinks the
    /// directory while it can. Every precondition is rechecked under
    /// the exclusive latch; any mismatch means another writer got here
    /// first and the merge quietly stands down.
    fn merge(&self, key: &K) -> Result<(), DatabaseError> {
        let _table = self.table_latch.write().unwrap();
        let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;

        let (bucket_page_id, image_page_id) = {
            let data = directory_page.read();
            let directory = HashDirectoryPage::new(&data[..]);
            let bucket_idx = self.key_to_index(key, &directory);
            let local_depth = directory.local_depth(bucket_idx);
            if local_depth == 0 {
                return Ok(());
            }
            let split_idx = directory.split_image_index(bucket_idx);
            if directory.local_depth(split_idx) != local_depth {
                return Ok(());
            }
            (
                directory.bucket_page_id(bucket_idx),
                directory.bucket_page_id(split_idx),
            )
        };

        {
            let bucket_page = self.buffer_pool.fetch_page(bucket_page_id)?;
            let data = bucket_page.read();
            if !HashBucketPage::<K, V>::new(&data[..]).is_empty() {
                return Ok(());
            }
        }

        debug!(
            "merging empty bucket page {} into page {}",
            bucket_page_id, image_page_id
        );
        {
            let mut data = directory_page.write();
            let mut directory = HashDirectoryPageMut::new(&mut data[..]);
            for idx in 0..directory.size() {
                let page_id = directory.bucket_page_id(idx);
                if page_id == bucket_page_id || page_id == image_page_id {
                    directory.set_bucket_page_id(idx, image_page_id);
                    directory.decr_local_depth(idx);
                }
            }
            while directory.can_shrink() {
                directory.decr_global_depth();
            }
        }

        self.buffer_pool.delete_page(bucket_page_id)?;
        Ok(())
    }

    pub fn get_global_depth(&self) -> Result<u32, DatabaseError> {
        let _table = self.table_latch.read().unwrap();
        let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let data = directory_page.read();
        Ok(HashDirectoryPage::new(&data[..]).global_depth())
    }

    /// Asserts the directory invariants; panics on violation.
    pub fn verify_integrity(&self) -> Result<(), DatabaseError> {
        let _table = self.table_latch.read().unwrap();
        let directory_page = self.buffer_pool.fetch_page(self.directory_page_id)?;
        let data = directory_page.read();
        let directory = HashDirectoryPage::new(&data[..]);
        directory.verify_integrity();
        Ok(())
    }
}
