use std::sync::Arc;
use std::thread;

use lumbung::{
    buffer::{BufferPool, BufferPoolInstance},
    index::{
        bucket_page::bucket_array_size, Crc32Hasher, ExtendibleHashTable, IntComparator,
        KeyHasher, Rid,
    },
    types::Transaction,
    utils::{logger, mock::TempDatabase},
};
use rand::{seq::SliceRandom, SeedableRng};

/// Hashes a key to itself, so tests can aim keys at directory slots.
struct IdentityHasher;

impl KeyHasher<i32> for IdentityHasher {
    fn hash_key(&self, key: &i32) -> u32 {
        *key as u32
    }
}

/// Sends every key to slot zero, for collision-storm scenarios.
struct ConstHasher;

impl KeyHasher<i32> for ConstHasher {
    fn hash_key(&self, _key: &i32) -> u32 {
        0
    }
}

fn setup(pool_size: usize) -> (TempDatabase, Arc<dyn BufferPool>) {
    logger::init();
    let db = TempDatabase::with_prefix("hash_table");
    let pool: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(
        pool_size,
        db.disk_manager(),
        db.log_manager(),
    ));
    (db, pool)
}

#[test]
fn test_insert_and_get_value() {
    let (_db, pool) = setup(8);
    let table =
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i64>::new()).unwrap();
    let txn = Transaction::default();

    for key in 0..50i64 {
        assert!(table.insert(&txn, &key, &Rid::new(key as i32, 0)).unwrap());
    }
    for key in 0..50i64 {
        assert_eq!(
            table.get_value(&txn, &key).unwrap(),
            vec![Rid::new(key as i32, 0)]
        );
    }
    assert!(table.get_value(&txn, &999).unwrap().is_empty());
    table.verify_integrity().unwrap();
}

#[test]
fn test_duplicate_pair_rejected() {
    let (_db, pool) = setup(8);
    let table =
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i32>::new()).unwrap();
    let txn = Transaction::default();

    assert!(table.insert(&txn, &1, &10).unwrap());
    assert!(!table.insert(&txn, &1, &10).unwrap());
    // Same key, different value: non-unique keys are supported.
    assert!(table.insert(&txn, &1, &11).unwrap());

    let mut values = table.get_value(&txn, &1).unwrap();
    values.sort();
    assert_eq!(values, vec![10, 11]);
}

#[test]
fn test_remove_then_lookup_is_empty() {
    let (_db, pool) = setup(8);
    let table =
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i32>::new()).unwrap();
    let txn = Transaction::default();

    assert!(!table.remove(&txn, &5, &50).unwrap());
    assert!(table.insert(&txn, &5, &50).unwrap());
    assert!(table.remove(&txn, &5, &50).unwrap());
    assert!(table.get_value(&txn, &5).unwrap().is_empty());
    assert!(!table.remove(&txn, &5, &50).unwrap());
    table.verify_integrity().unwrap();
}

#[test]
fn test_split_grows_directory_and_keeps_every_key() {
    let (_db, pool) = setup(8);
    let table = ExtendibleHashTable::new(pool, IntComparator, IdentityHasher).unwrap();
    let txn = Transaction::default();
    let capacity = bucket_array_size::<i32, i32>() as i32;

    assert_eq!(table.get_global_depth().unwrap(), 0);

    // One more key than a bucket holds: the overflowing insert splits
    // the root bucket and doubles the directory.
    for key in 0..=capacity {
        assert!(table.insert(&txn, &key, &(key * 2)).unwrap(), "key {}", key);
    }
    assert_eq!(table.get_global_depth().unwrap(), 1);
    table.verify_integrity().unwrap();

    for key in 0..=capacity {
        assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key * 2]);
    }
}

#[test]
fn test_merge_shrinks_directory_back() {
    let (_db, pool) = setup(8);
    let table = ExtendibleHashTable::new(pool, IntComparator, IdentityHasher).unwrap();
    let txn = Transaction::default();
    let capacity = bucket_array_size::<i32, i32>() as i32;

    for key in 0..=capacity {
        table.insert(&txn, &key, &(key * 2)).unwrap();
    }
    assert_eq!(table.get_global_depth().unwrap(), 1);

    // Draining the odd bucket empties it; the merge folds it back into
    // its split image and the directory shrinks to depth zero.
    for key in (1..=capacity).step_by(2) {
        assert!(table.remove(&txn, &key, &(key * 2)).unwrap(), "key {}", key);
    }
    assert_eq!(table.get_global_depth().unwrap(), 0);
    table.verify_integrity().unwrap();

    for key in (0..=capacity).step_by(2) {
        assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key * 2]);
    }
    for key in (1..=capacity).step_by(2) {
        assert!(table.get_value(&txn, &key).unwrap().is_empty());
    }
}

#[test]
fn test_collision_storm_fails_cleanly_at_full_bucket() {
    let (_db, pool) = setup(8);
    let table = ExtendibleHashTable::new(pool, IntComparator, ConstHasher).unwrap();
    let txn = Transaction::default();
    let capacity = bucket_array_size::<i32, i32>() as i32;

    for key in 0..capacity {
        assert!(table.insert(&txn, &key, &key).unwrap(), "key {}", key);
    }

    // Every key collides, so splitting cannot relieve the bucket; the
    // insert is rejected and the directory stays sound.
    assert!(!table.insert(&txn, &capacity, &capacity).unwrap());
    table.verify_integrity().unwrap();

    for key in 0..capacity {
        assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key]);
    }

    // Freeing a slot lets the rejected pair in.
    assert!(table.remove(&txn, &0, &0).unwrap());
    assert!(table.insert(&txn, &capacity, &capacity).unwrap());
}

#[test]
fn test_paging_under_a_small_pool() {
    let (_db, pool) = setup(4);
    let table =
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i64>::new()).unwrap();
    let txn = Transaction::default();

    // Enough keys to spread over many bucket pages, with only four
    // frames to hold them: every operation churns through eviction.
    for key in 0..2000i64 {
        assert!(table.insert(&txn, &key, &Rid::new(key as i32, 7)).unwrap());
    }
    table.verify_integrity().unwrap();
    assert!(table.get_global_depth().unwrap() > 1);

    for key in 0..2000i64 {
        assert_eq!(
            table.get_value(&txn, &key).unwrap(),
            vec![Rid::new(key as i32, 7)],
            "key {}",
            key
        );
    }

    for key in (0..2000i64).step_by(2) {
        assert!(table.remove(&txn, &key, &Rid::new(key as i32, 7)).unwrap());
    }
    table.verify_integrity().unwrap();
    for key in 0..2000i64 {
        let values = table.get_value(&txn, &key).unwrap();
        if key % 2 == 0 {
            assert!(values.is_empty());
        } else {
            assert_eq!(values, vec![Rid::new(key as i32, 7)]);
        }
    }
}

#[test]
fn test_concurrent_inserts_from_many_threads() {
    const THREADS: i32 = 4;
    const KEYS_PER_THREAD: i32 = 500;

    let (_db, pool) = setup(16);
    let table = Arc::new(
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i32>::new()).unwrap(),
    );

    let mut handles = Vec::new();
    for t in 0..THREADS {
        let table = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            let txn = Transaction::new(t as u64);
            let mut rng = rand::rngs::StdRng::seed_from_u64(t as u64);
            let mut keys: Vec<i32> =
                (t * KEYS_PER_THREAD..(t + 1) * KEYS_PER_THREAD).collect();
            keys.shuffle(&mut rng);
            for key in keys {
                assert!(table.insert(&txn, &key, &(key * 10)).unwrap());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    table.verify_integrity().unwrap();
    let txn = Transaction::default();
    let mut total = 0;
    for key in 0..THREADS * KEYS_PER_THREAD {
        let values = table.get_value(&txn, &key).unwrap();
        assert_eq!(values, vec![key * 10], "key {}", key);
        total += values.len();
    }
    assert_eq!(total, (THREADS * KEYS_PER_THREAD) as usize);
}

#[test]
fn test_concurrent_mixed_inserts_and_removes() {
    const THREADS: i32 = 4;
    const KEYS_PER_THREAD: i32 = 300;

    let (_db, pool) = setup(16);
    let table = Arc::new(
        ExtendibleHashTable::new(pool, IntComparator, Crc32Hasher::<i32>::new()).unwrap(),
    );

    let mut handles = Vec::new();
    for t in 0..THREADS {
        let table = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            let txn = Transaction::new(t as u64);
            let base = t * KEYS_PER_THREAD;
            for key in base..base + KEYS_PER_THREAD {
                assert!(table.insert(&txn, &key, &key).unwrap());
            }
            // Each thread removes its own lower half again.
            for key in base..base + KEYS_PER_THREAD / 2 {
                assert!(table.remove(&txn, &key, &key).unwrap());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    table.verify_integrity().unwrap();
    let txn = Transaction::default();
    for t in 0..THREADS {
        let base = t * KEYS_PER_THREAD;
        for key in base..base + KEYS_PER_THREAD {
            let values = table.get_value(&txn, &key).unwrap();
            if key < base + KEYS_PER_THREAD / 2 {
                assert!(values.is_empty(), "key {}", key);
            } else {
                assert_eq!(values, vec![key], "key {}", key);
            }
        }
    }
}
