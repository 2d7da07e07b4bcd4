//! Tests for node splitting and tree growth
//!
//! These tests verify:
//! - The first split happens exactly when a leaf overflows
//! - Root growth adds one level at a time
//! - Structural invariants hold for ascending, descending and shuffled input
//! - Inner splits favour the half that receives the new key

use plankdb::btree::{BPTree, Node};

use crate::common::{check_tree, options_with_order, scrambled, setup_temp_index};

#[test]
fn test_leaf_splits_on_order_th_key() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
    let first_root = tree.root_offset();

    for k in 1..=5 {
        tree.insert(k, k as u64).unwrap();
    }
    assert_eq!(tree.root_offset(), first_root);
    assert_eq!(tree.height().unwrap(), 1);

    tree.insert(6, 6).unwrap();
    assert_ne!(tree.root_offset(), first_root);
    assert_eq!(tree.height().unwrap(), 2);

    let root = tree.root_offset();
    match tree.node(root).unwrap() {
        Node::Inner(inner) => {
            // Separator is the last key of the lower half
            assert_eq!(inner.keys, vec![3]);
            assert_eq!(inner.children[0], first_root);
        }
        Node::Leaf(_) => panic!("root should be inner after a split"),
    }

    let shape = check_tree(&mut tree);
    assert_eq!(shape.leaves.len(), 2);
}

#[test]
fn test_key_equal_to_separator_found_left() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(4)).unwrap();
    for k in [10, 20, 30, 40] {
        tree.insert(k, k as u64).unwrap();
    }
    // Duplicate of the separator after the split
    tree.insert(20, 21).unwrap();

    assert_eq!(tree.find(&20).unwrap(), vec![20, 21]);
    check_tree(&mut tree);
}

#[test]
fn test_ascending_inserts() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(5)).unwrap();
    for k in 0..1000 {
        tree.insert(k, k as u64).unwrap();
    }

    let shape = check_tree(&mut tree);
    assert!(shape.inner_nodes > 1);
    assert!(tree.height().unwrap() >= 4);
    for k in (0..1000).step_by(37) {
        assert_eq!(tree.find(&k).unwrap(), vec![k as u64]);
    }
}

#[test]
fn test_descending_inserts() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();
    for k in (0..1000).rev() {
        tree.insert(k, k as u64).unwrap();
    }

    check_tree(&mut tree);
    assert_eq!(
        tree.range_find(&0, &999).unwrap(),
        (0..1000).collect::<Vec<u64>>()
    );
}

#[test]
fn test_shuffled_inserts_every_order() {
    for order in 4..=9 {
        let (_temp, path) = setup_temp_index();
        let mut tree = BPTree::<i32>::open(&path, &options_with_order(order)).unwrap();

        let mut keys = scrambled(800, 100_000, order as u64);
        for &k in &keys {
            tree.insert(k, k as u64).unwrap();
        }
        check_tree(&mut tree);

        keys.sort_unstable();
        let values: Vec<u64> = keys.iter().map(|&k| k as u64).collect();
        assert_eq!(
            tree.range_find(&i32::MIN, &i32::MAX).unwrap(),
            values,
            "order {}",
            order
        );
    }
}

// =============================================================================
// Inner Split Side Tests
// =============================================================================

/// Key counts of the root's two children after the first inner split
fn inner_halves(tree: &mut BPTree<i32>) -> (usize, usize) {
    let root = tree.root_offset();
    let children = match tree.node(root).unwrap() {
        Node::Inner(inner) => {
            assert_eq!(inner.keys.len(), 1);
            inner.children
        }
        Node::Leaf(_) => panic!("root should be inner"),
    };
    let count = |node: Node<i32, u64>| match node {
        Node::Inner(inner) => inner.keys.len(),
        Node::Leaf(_) => panic!("expected inner child of the root"),
    };
    let lower = count(tree.node(children[0]).unwrap());
    let upper = count(tree.node(children[1]).unwrap());
    (lower, upper)
}

#[test]
fn test_inner_split_new_key_in_upper_half() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();

    // Ascending: every separator lands at the right end of the parent
    for k in 1..=21 {
        tree.insert(k, k as u64).unwrap();
    }

    assert_eq!(tree.height().unwrap(), 3);
    assert_eq!(inner_halves(&mut tree), (2, 3));
    check_tree(&mut tree);
}

#[test]
fn test_inner_split_new_key_in_lower_half() {
    let (_temp, path) = setup_temp_index();
    let mut tree = BPTree::<i32>::open(&path, &options_with_order(6)).unwrap();

    // Descending: every separator lands at the left end of the parent
    for k in (1..=21).rev() {
        tree.insert(k, k as u64).unwrap();
    }

    assert_eq!(tree.height().unwrap(), 3);
    assert_eq!(inner_halves(&mut tree), (3, 2));
    check_tree(&mut tree);
}
