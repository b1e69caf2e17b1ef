pub mod bucket_page;
pub mod directory_page;
pub mod extendible_hash_table;
pub mod key;

pub use extendible_hash_table::ExtendibleHashTable;
pub use key::{Crc32Hasher, FixedKey, FixedValue, IntComparator, KeyComparator, KeyHasher, Rid};
