//! Tests for persistence and the node cache
//!
//! These tests verify:
//! - Close and reopen reproduces every lookup
//! - The persisted tree keeps its fill factor
//! - Every node is exactly one block
//! - A small cache flushes wholesale and stays bounded
//! - Header mismatches are detected on open

use plankdb::btree::{BPTree, TreeOptions};
use plankdb::PlankError;

use crate::common::{check_tree, options_with_order, scrambled, setup_temp_index};

#[test]
fn test_reopen_reproduces_lookups() {
    let (_temp, path) = setup_temp_index();
    let keys = scrambled(2000, 500, 11);

    let (before_find, before_range) = {
        let mut tree = BPTree::<i32>::open(&path, &options_with_order(7)).unwrap();
        for (i, &k) in keys.iter().enumerate() {
            tree.insert(k, i as u64).unwrap();
        }
        let found: Vec<Vec<u64>> = (0..500).map(|k| tree.find(&k).unwrap()).collect();
        let range = tree.range_find(&100, &250).unwrap();
        tree.close().unwrap();
        (found, range)
    };

    let mut tree = BPTree::<i32>::open(&path, &options_with_order(7)).unwrap();
    let after_find: Vec<Vec<u64>> = (0..500).map(|k| tree.find(&k).unwrap()).collect();
    assert_eq!(after_find, before_find);
    assert_eq!(tree.range_find(&100, &250).unwrap(), before_range);
}

#[test]
fn test_fill_factor_after_reopen() {
    let (_temp, path) = setup_temp_index();
    {
        let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
        for k in scrambled(3000, 1_000_000, 3) {
            tree.insert(k, 1).unwrap();
        }
        tree.close().unwrap();
    }

    // Fresh handle: every node comes from disk
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
    assert_eq!(tree.cache().len(), 0);
    let shape = check_tree(&mut tree);
    assert!(shape.leaves.len() > 100);
}

#[test]
fn test_file_is_whole_blocks() {
    for block_size in [256usize, 512, 4096] {
        let (_temp, path) = setup_temp_index();
        let options = TreeOptions {
            block_size,
            ..TreeOptions::default()
        };
        let mut tree = BPTree::<i64>::open(&path, &options).unwrap();
        for k in 0..500 {
            tree.insert(k, k as u64).unwrap();
            tree.insert(k % 7, k as u64).unwrap();
        }
        tree.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len % block_size as u64, 0, "block size {}", block_size);
    }
}

#[test]
fn test_small_cache_flushes_and_stays_bounded() {
    let (_temp, path) = setup_temp_index();
    let options = TreeOptions {
        cache_capacity: 4,
        order: Some(4),
        ..TreeOptions::default()
    };

    let mut tree = BPTree::<i32>::open(&path, &options).unwrap();
    for k in scrambled(500, 10_000, 5) {
        tree.insert(k, k as u64).unwrap();
        assert!(tree.cache().len() <= 4);
    }
    assert!(tree.cache().flush_count() > 0);

    // Lookups through a cache that keeps flushing still see every key
    for k in scrambled(500, 10_000, 5) {
        assert!(tree.find(&k).unwrap().contains(&(k as u64)));
    }
    check_tree(&mut tree);
}

#[test]
fn test_drop_without_close_flushes() {
    let (_temp, path) = setup_temp_index();
    {
        let mut tree = BPTree::<i32>::open(&path, &options_with_order(5)).unwrap();
        for k in 0..200 {
            tree.insert(k, k as u64 + 1).unwrap();
        }
    }

    let mut tree = BPTree::<i32>::open(&path, &options_with_order(5)).unwrap();
    assert_eq!(tree.find(&150).unwrap(), vec![151]);
    check_tree(&mut tree);
}

#[test]
fn test_reopen_with_other_key_width_is_corruption() {
    let (_temp, path) = setup_temp_index();
    BPTree::<i32>::open(&path, &TreeOptions::default())
        .unwrap()
        .close()
        .unwrap();

    let result = BPTree::<i64>::open(&path, &TreeOptions::default());
    assert!(matches!(result, Err(PlankError::Corruption(_))));

    let other_block = TreeOptions {
        block_size: 1024,
        ..TreeOptions::default()
    };
    let result = BPTree::<i32>::open(&path, &other_block);
    assert!(matches!(result, Err(PlankError::Corruption(_))));
}

#[test]
fn test_invalid_order_rejected() {
    let (_temp, path) = setup_temp_index();
    let result = BPTree::<i32>::open(&path, &options_with_order(3));
    assert!(matches!(result, Err(PlankError::Config(_))));

    let result = BPTree::<i32>::open(&path, &options_with_order(10_000));
    assert!(matches!(result, Err(PlankError::Config(_))));
}

#[test]
fn test_reopen_with_other_order_is_corruption() {
    let (_temp, path) = setup_temp_index();
    {
        let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
        for k in 0..3 {
            tree.insert(k, 100 + k as u64).unwrap();
        }
        tree.close().unwrap();
    }

    let result = BPTree::<i32>::open(&path, &TreeOptions::default());
    assert!(matches!(result, Err(PlankError::Corruption(_))));

    let result = BPTree::<i32>::open(&path, &options_with_order(8));
    assert!(matches!(result, Err(PlankError::Corruption(_))));

    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
    assert_eq!(tree.find(&1).unwrap(), vec![101]);
}
