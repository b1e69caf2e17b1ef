use lumbung::buffer::LruReplacer;

#[test]
fn test_victim_order_is_least_recently_unpinned() {
    let replacer = LruReplacer::new(7);

    for frame in 1..=6 {
        replacer.unpin(frame);
    }
    assert_eq!(replacer.len(), 6);

    // The first frames unpinned are the first ones evicted.
    assert_eq!(replacer.victim(), Some(1));
    assert_eq!(replacer.victim(), Some(2));
    assert_eq!(replacer.victim(), Some(3));
    assert_eq!(replacer.len(), 3);

    // Pinning withdraws a frame; a later unpin re-enters it as most
    // recent.
    replacer.pin(3);
    replacer.pin(4);
    assert_eq!(replacer.len(), 2);

    replacer.unpin(4);
    assert_eq!(replacer.len(), 3);

    assert_eq!(replacer.victim(), Some(5));
    assert_eq!(replacer.victim(), Some(6));
    assert_eq!(replacer.victim(), Some(4));
    assert_eq!(replacer.victim(), None);
}

#[test]
fn test_duplicate_unpin_keeps_position() {
    let replacer = LruReplacer::new(4);

    replacer.unpin(1);
    replacer.unpin(2);
    replacer.unpin(1);
    assert_eq!(replacer.len(), 2);

    // Frame 1 keeps its original spot, so it is still the victim.
    assert_eq!(replacer.victim(), Some(1));
    assert_eq!(replacer.victim(), Some(2));
}

#[test]
fn test_pin_absent_frame_is_noop() {
    let replacer = LruReplacer::new(4);

    replacer.pin(9);
    assert_eq!(replacer.len(), 0);

    replacer.unpin(1);
    replacer.pin(9);
    assert_eq!(replacer.len(), 1);
    assert_eq!(replacer.victim(), Some(1));
}

#[test]
fn test_empty_replacer_has_no_victim() {
    let replacer = LruReplacer::new(4);
    assert!(replacer.is_empty());
    assert_eq!(replacer.victim(), None);
}
