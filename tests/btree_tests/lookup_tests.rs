//! Tests for point and range lookups
//!
//! These tests verify:
//! - find returns exactly the inserted multiset
//! - range_find equals find over every key in the range, ascending
//! - Empty, inverted and out-of-span ranges
//! - Fixed-width text keys

use std::collections::BTreeMap;

use plankdb::btree::{BPTree, TreeOptions};
use plankdb::PlankError;

use crate::common::{options_with_order, scrambled, setup_temp_index};

// =============================================================================
// Helper Functions
// =============================================================================

/// Insert scrambled keys (with repeats) and return the expected multimap
fn populated_tree(
    path: &std::path::Path,
    order: usize,
) -> (BPTree<i32>, BTreeMap<i32, Vec<u64>>) {
    let mut tree = BPTree::<i32>::open(path, &options_with_order(order)).unwrap();
    let mut expected: BTreeMap<i32, Vec<u64>> = BTreeMap::new();

    for (i, key) in scrambled(600, 200, 7).into_iter().enumerate() {
        // Skip every third key value to leave gaps
        let key = key * 3;
        tree.insert(key, i as u64).unwrap();
        expected.entry(key).or_default().push(i as u64);
    }
    (tree, expected)
}

// =============================================================================
// Point Lookup Tests
// =============================================================================

#[test]
fn test_empty_tree_finds_nothing() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i64>::open(&path, &TreeOptions::default()).unwrap();

    assert!(tree.find(&0).unwrap().is_empty());
    assert!(tree.range_find(&i64::MIN, &i64::MAX).unwrap().is_empty());
}

#[test]
fn test_find_returns_inserted_multiset() {
    let (_temp, path) = setup_temp_index();
    let (mut tree, expected) = populated_tree(&path, 5);

    for (key, values) in &expected {
        assert_eq!(&tree.find(key).unwrap(), values, "key {}", key);
    }
    // Gaps between multiples of three
    assert!(tree.find(&1).unwrap().is_empty());
    assert!(tree.find(&-3).unwrap().is_empty());
    assert!(tree.find(&600).unwrap().is_empty());
}

// =============================================================================
// Range Lookup Tests
// =============================================================================

#[test]
fn test_range_equals_concatenated_finds() {
    let (_temp, path) = setup_temp_index();
    let (mut tree, expected) = populated_tree(&path, 5);

    let ranges = [(0, 597), (1, 2), (10, 50), (-100, 5), (590, 1000), (33, 33), (100, 400)];
    for (first, last) in ranges {
        let concatenated: Vec<u64> = expected
            .range(first..=last)
            .flat_map(|(_, values)| values.iter().copied())
            .collect();
        assert_eq!(
            tree.range_find(&first, &last).unwrap(),
            concatenated,
            "range [{}, {}]",
            first,
            last
        );
    }
}

#[test]
fn test_inverted_range_is_empty() {
    let (_temp, path) = setup_temp_index();
    let (mut tree, _) = populated_tree(&path, 6);

    assert!(tree.range_find(&300, &200).unwrap().is_empty());
}

#[test]
fn test_range_starting_past_leaf_end_continues_in_next_leaf() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(4)).unwrap();
    for k in (0..100).step_by(10) {
        tree.insert(k, k as u64).unwrap();
    }

    // Every gap key, including those just past a leaf's last key
    for first in (1..100).step_by(10) {
        let expected: Vec<u64> = ((first + 9)..100).step_by(10).map(|k| k as u64).collect();
        assert_eq!(tree.range_find(&first, &99).unwrap(), expected, "from {}", first);
    }
}

// =============================================================================
// Text Key Tests
// =============================================================================

#[test]
fn test_text_keys() {
    let (_temp, path) = setup_temp_index();
    let mut tree =
        BPTree::<String>::open_with_key_width(&path, 12, &options_with_order(4)).unwrap();

    let names = ["mallory", "alice", "trent", "bob", "carol", "dave", "eve", "alice"];
    for (i, name) in names.iter().enumerate() {
        tree.insert(name.to_string(), i as u64).unwrap();
    }

    assert_eq!(tree.find(&"alice".to_string()).unwrap(), vec![1, 7]);
    assert_eq!(tree.find(&"trent".to_string()).unwrap(), vec![2]);
    assert!(tree.find(&"zed".to_string()).unwrap().is_empty());

    // b..=d: bob, carol, dave
    let range = tree
        .range_find(&"b".to_string(), &"dz".to_string())
        .unwrap();
    assert_eq!(range, vec![3, 4, 5]);
}

#[test]
fn test_text_key_too_long_rejected() {
    let (_temp, path) = setup_temp_index();
    let mut tree =
        BPTree::<String>::open_with_key_width(&path, 4, &TreeOptions::default()).unwrap();

    let result = tree.insert("toolong".to_string(), 1);
    assert!(matches!(result, Err(PlankError::SchemaViolation(_))));
    assert!(tree.range_find(&String::new(), &"zzzz".to_string()).unwrap().is_empty());
}

#[test]
fn test_text_keys_need_explicit_width() {
    let (_temp, path) = setup_temp_index();
    let result = BPTree::<String>::open(&path, &TreeOptions::default());
    assert!(matches!(result, Err(PlankError::Config(_))));
}
