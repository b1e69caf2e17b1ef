use lumbung::{
    buffer::{BufferPool, ShardedBufferPool},
    types::{error::DatabaseError, PageId},
    utils::{logger, mock::TempDatabase},
};

fn setup(num_shards: usize, pool_size_per_shard: usize) -> (TempDatabase, ShardedBufferPool) {
    logger::init();
    let db = TempDatabase::with_prefix("sharded_pool");
    let pool = ShardedBufferPool::new(
        num_shards,
        pool_size_per_shard,
        db.disk_manager(),
        db.log_manager(),
    );
    (db, pool)
}

#[test]
fn test_pool_size_is_sum_of_shards() {
    let (_db, pool) = setup(5, 3);
    assert_eq!(pool.num_shards(), 5);
    assert_eq!(pool.pool_size(), 15);
}

#[test]
fn test_round_robin_allocation_spreads_shards() {
    let (_db, pool) = setup(5, 3);

    // The cursor starts at shard 0 and advances one shard per call;
    // every shard hands out ids congruent to its own index.
    let mut ids: Vec<PageId> = Vec::new();
    for _ in 0..10 {
        let page = pool.new_page().unwrap();
        ids.push(page.page_id());
    }
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_operations_route_to_owning_shard() {
    let (_db, pool) = setup(3, 2);

    let page_id;
    {
        let page = pool.new_page().unwrap();
        page_id = page.page_id();
        page.write().fill(0x5a);
    }

    let page = pool.fetch_page(page_id).unwrap();
    assert!(page.read().iter().all(|&b| b == 0x5a));
    drop(page);

    assert!(pool.flush_page(page_id).unwrap());
    assert!(pool.delete_page(page_id).unwrap());
    assert!(!pool.flush_page(page_id).unwrap());
}

#[test]
fn test_exhaustion_only_when_every_shard_is_full() {
    let (_db, pool) = setup(2, 2);

    // Four frames in total; the router must find room on whichever
    // shard still has a frame, wherever the cursor happens to point.
    let pages: Vec<_> = (0..4).map(|_| pool.new_page().unwrap()).collect();
    assert!(matches!(
        pool.new_page(),
        Err(DatabaseError::BufferPoolExhausted)
    ));

    drop(pages);
    assert!(pool.new_page().is_ok());
}

#[test]
fn test_flush_all_covers_every_shard() {
    let (db, pool) = setup(3, 2);

    let mut ids = Vec::new();
    for fill in 1..=3u8 {
        let page = pool.new_page().unwrap();
        page.write().fill(fill);
        ids.push(page.page_id());
    }
    pool.flush_all_pages().unwrap();

    let reopened = ShardedBufferPool::new(3, 2, db.disk_manager(), db.log_manager());
    for (&page_id, fill) in ids.iter().zip(1..=3u8) {
        let page = reopened.fetch_page(page_id).unwrap();
        assert!(page.read().iter().all(|&b| b == fill), "page {}", page_id);
    }
}
