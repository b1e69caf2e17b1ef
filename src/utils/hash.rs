use crc32fast::Hasher;

/// 32-bit hash of arbitrary bytes, used by the extendible hash index
/// to map encoded keys to directory slots.
pub fn crc32_hash(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
