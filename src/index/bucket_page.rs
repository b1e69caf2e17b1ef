use std::{cmp::Ordering, marker::PhantomData};

use crate::{
    index::key::{FixedKey, FixedValue, KeyComparator},
    types::PAGE_SIZE,
};

/*
 * Bucket Page Layout on Disk
 * ┌──────────────────────────────────────────────────────────────┐
 * │ occupied bitmap (⌈capacity/8⌉)                               │
 * ├──────────────────────────────────────────────────────────────┤
 * │ readable bitmap (⌈capacity/8⌉)                               │
 * ├──────────────────────────────────────────────────────────────┤
 * │ entries: [key bytes | value bytes] × capacity                │
 * └──────────────────────────────────────────────────────────────┘
 *
 * A slot's occupied bit is set the first time it holds an entry and
 * never cleared by removal, so a clear occupied bit marks the end of
 * everything ever written and scans stop there. The readable bit is
 * the live marker: set on insert, cleared on remove.
 */

/// Slots per bucket for an entry of `entry_size` bytes. Each slot costs
/// its entry plus two bitmap bits, giving roughly 8·PAGE_SIZE /
/// (8·entry_size + 2) slots; the loop then backs off for the rounding
/// the byte-granular bitmaps introduce.
pub const fn bucket_capacity(entry_size: usize) -> usize {
    let mut capacity = 4 * PAGE_SIZE / (4 * entry_size + 1);
    while 2 * ((capacity + 7) / 8) + capacity * entry_size > PAGE_SIZE {
        capacity -= 1;
    }
    capacity
}

pub fn bucket_array_size<K: FixedKey, V: FixedValue>() -> usize {
    bucket_capacity(K::ENCODED_SIZE + V::ENCODED_SIZE)
}

fn bitmap_bytes(capacity: usize) -> usize {
    (capacity + 7) / 8
}

struct Layout {
    capacity: usize,
    readable_offset: usize,
    entries_offset: usize,
    entry_size: usize,
}

fn layout<K: FixedKey, V: FixedValue>() -> Layout {
    let entry_size = K::ENCODED_SIZE + V::ENCODED_SIZE;
    let capacity = bucket_capacity(entry_size);
    let bitmap = bitmap_bytes(capacity);
    debug_assert!(2 * bitmap + capacity * entry_size <= PAGE_SIZE);
    Layout {
        capacity,
        readable_offset: bitmap,
        entries_offset: 2 * bitmap,
        entry_size,
    }
}

fn bit_is_set(bitmap: &[u8], idx: usize) -> bool {
    bitmap[idx >> 3] & (1 << (idx & 7)) != 0
}

/// Read-only view of a hash bucket stored in a buffer pool page.
pub struct HashBucketPage<'a, K, V> {
    data: &'a [u8],
    _marker: PhantomData<fn(K, V)>,
}

impl<'a, K: FixedKey, V: FixedValue> HashBucketPage<'a, K, V> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= PAGE_SIZE);
        Self {
            data,
            _marker: PhantomData,
        }
    }

    pub fn capacity() -> usize {
        bucket_array_size::<K, V>()
    }

    pub fn is_occupied(&self, idx: usize) -> bool {
        bit_is_set(self.data, idx)
    }

    pub fn is_readable(&self, idx: usize) -> bool {
        let l = layout::<K, V>();
        bit_is_set(&self.data[l.readable_offset..], idx)
    }

    /// Decodes the key in slot `idx`. Only meaningful for readable
    /// slots.
    pub fn key_at(&self, idx: usize) -> K {
        let l = layout::<K, V>();
        let off = l.entries_offset + idx * l.entry_size;
        K::decode(&self.data[off..off + K::ENCODED_SIZE])
    }

    /// Decodes the value in slot `idx`. Only meaningful for readable
    /// slots.
    pub fn value_at(&self, idx: usize) -> V {
        let l = layout::<K, V>();
        let off = l.entries_offset + idx * l.entry_size + K::ENCODED_SIZE;
        V::decode(&self.data[off..off + V::ENCODED_SIZE])
    }

    /// Collects every live value stored under `key`. The scan stops at
    /// the first never-occupied slot.
    pub fn get_all<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> Vec<V> {
        let mut result = Vec::new();
        for idx in 0..Self::capacity() {
            if self.is_readable(idx) && cmp.compare(&self.key_at(idx), key) == Ordering::Equal {
                result.push(self.value_at(idx));
            }
            if !self.is_occupied(idx) {
                break;
            }
        }
        result
    }

    /// True when every slot holds a live entry, including the partial
    /// tail byte of the bitmap.
    pub fn is_full(&self) -> bool {
        let l = layout::<K, V>();
        let readable = &self.data[l.readable_offset..];
        let full_bytes = l.capacity / 8;
        for i in 0..full_bytes {
            if readable[i] != 0xff {
                return false;
            }
        }
        let remainder = l.capacity - full_bytes * 8;
        remainder == 0 || readable[full_bytes] == (1u8 << remainder) - 1
    }

    pub fn is_empty(&self) -> bool {
        let l = layout::<K, V>();
        self.data[l.readable_offset..l.readable_offset + bitmap_bytes(l.capacity)]
            .iter()
            .all(|&b| b == 0)
    }

    /// Live entry count, by Kernighan popcount over the readable bitmap.
    pub fn num_readable(&self) -> usize {
        let l = layout::<K, V>();
        let readable = &self.data[l.readable_offset..l.readable_offset + bitmap_bytes(l.capacity)];
        let mut count = 0;
        for &byte in readable {
            let mut n = byte;
            while n != 0 {
                n &= n - 1;
                count += 1;
            }
        }
        count
    }
}

/// Mutable view of a hash bucket.
pub struct HashBucketPageMut<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<fn(K, V)>,
}

impl<'a, K: FixedKey, V: FixedValue> HashBucketPageMut<'a, K, V> {
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= PAGE_SIZE);
        Self {
            data,
            _marker: PhantomData,
        }
    }

    fn as_read(&self) -> HashBucketPage<'_, K, V> {
        HashBucketPage::new(self.data)
    }

    pub fn capacity() -> usize {
        bucket_array_size::<K, V>()
    }

    pub fn is_occupied(&self, idx: usize) -> bool {
        self.as_read().is_occupied(idx)
    }

    pub fn is_readable(&self, idx: usize) -> bool {
        self.as_read().is_readable(idx)
    }

    pub fn key_at(&self, idx: usize) -> K {
        self.as_read().key_at(idx)
    }

    pub fn value_at(&self, idx: usize) -> V {
        self.as_read().value_at(idx)
    }

    pub fn get_all<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> Vec<V> {
        self.as_read().get_all(key, cmp)
    }

    pub fn is_full(&self) -> bool {
        self.as_read().is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.as_read().is_empty()
    }

    pub fn num_readable(&self) -> usize {
        self.as_read().num_readable()
    }

    /// Inserts a pair into the lowest free slot. Rejects an exact
    /// duplicate (same key and same value) and a full bucket.
    ///
    /// One scan does both jobs: readable slots are checked for the
    /// duplicate, the first non-readable slot is remembered as the
    /// landing spot, and a clear occupied bit ends the search early.
    pub fn insert<C: KeyComparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        let capacity = Self::capacity();
        let mut target = capacity;
        for idx in 0..capacity {
            if self.is_readable(idx) {
                if cmp.compare(&self.key_at(idx), key) == Ordering::Equal
                    && self.value_at(idx) == *value
                {
                    return false;
                }
            } else {
                if target == capacity {
                    target = idx;
                }
                if !self.is_occupied(idx) {
                    break;
                }
            }
        }
        if target == capacity {
            return false;
        }

        self.write_entry(target, key, value);
        self.set_occupied(target);
        self.set_readable(target);
        true
    }

    /// Removes the entry matching both key and value, if present.
    pub fn remove<C: KeyComparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        for idx in 0..Self::capacity() {
            if self.is_readable(idx)
                && cmp.compare(&self.key_at(idx), key) == Ordering::Equal
                && self.value_at(idx) == *value
            {
                self.remove_at(idx);
                return true;
            }
            if !self.is_occupied(idx) {
                break;
            }
        }
        false
    }

    /// Clears only the readable bit; the occupied bit stays set so the
    /// slot keeps terminating scans correctly until it is reused.
    pub fn remove_at(&mut self, idx: usize) {
        let l = layout::<K, V>();
        self.data[l.readable_offset + (idx >> 3)] &= !(1 << (idx & 7));
    }

    fn set_occupied(&mut self, idx: usize) {
        self.data[idx >> 3] |= 1 << (idx & 7);
    }

    fn set_readable(&mut self, idx: usize) {
        let l = layout::<K, V>();
        self.data[l.readable_offset + (idx >> 3)] |= 1 << (idx & 7);
    }

    fn write_entry(&mut self, idx: usize, key: &K, value: &V) {
        let l = layout::<K, V>();
        let off = l.entries_offset + idx * l.entry_size;
        key.encode(&mut self.data[off..off + K::ENCODED_SIZE]);
        value.encode(&mut self.data[off + K::ENCODED_SIZE..off + l.entry_size]);
    }
}
