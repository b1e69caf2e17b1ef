use std::{cmp::Ordering, marker::PhantomData};

use crate::{types::PageId, utils::hash::crc32_hash};

/// A key with a fixed on-page encoding.
///
/// Bucket pages pack keys into fixed-width slots, so the layout depends
/// only on `ENCODED_SIZE`, never on the Rust type behind it.
pub trait FixedKey: Copy + Default + Send + Sync + 'static {
    const ENCODED_SIZE: usize;

    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Self;
}

/// A value with a fixed on-page encoding. Values are compared with `==`
/// when rejecting duplicate pairs and matching removals.
pub trait FixedValue: Copy + Default + PartialEq + Send + Sync + 'static {
    const ENCODED_SIZE: usize;

    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Self;
}

impl FixedKey for i32 {
    const ENCODED_SIZE: usize = 4;

    fn encode(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    }
}

impl FixedKey for i64 {
    const ENCODED_SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        i64::from_le_bytes([
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ])
    }
}

impl FixedValue for i32 {
    const ENCODED_SIZE: usize = 4;

    fn encode(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    }
}

impl FixedValue for i64 {
    const ENCODED_SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        i64::from_le_bytes([
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ])
    }
}

/// Row locator: which page, which slot. The usual value type for a
/// secondary index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }
}

impl FixedValue for Rid {
    const ENCODED_SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.slot.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            page_id: PageId::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            slot: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// Key ordering seam for the index.
pub trait KeyComparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Comparator for the integer key types.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntComparator;

impl KeyComparator<i32> for IntComparator {
    fn compare(&self, a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }
}

impl KeyComparator<i64> for IntComparator {
    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }
}

/// Hash seam for the index. The table keeps the low 32 bits, so
/// implementations return `u32` directly.
pub trait KeyHasher<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u32;
}

/// Default hasher: crc32 over the key's on-page encoding.
#[derive(Debug, Default)]
pub struct Crc32Hasher<K> {
    _marker: PhantomData<fn(K)>,
}

impl<K> Crc32Hasher<K> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K: FixedKey> KeyHasher<K> for Crc32Hasher<K> {
    fn hash_key(&self, key: &K) -> u32 {
        debug_assert!(K::ENCODED_SIZE <= 64);
        let mut buf = [0u8; 64];
        key.encode(&mut buf[..K::ENCODED_SIZE]);
        crc32_hash(&buf[..K::ENCODED_SIZE])
    }
}
