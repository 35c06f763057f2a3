//! End-to-end scenario on the classic geometry (fanout 5, 10 node slots).
//!
//! Every step is checked against the on-disk structure via `verify()`.

use slotindex::{BTree, Entry, NodeKind, Slot, SlotId, TreeConfig};
use tempfile::{tempdir, TempDir};

const FIRST_FIVE: [(i64, i64); 5] = [(3, 12), (7, 24), (10, 48), (24, 60), (14, 72)];

const REST: [(i64, i64); 13] = [
    (30, 96),
    (15, 108),
    (1, 120),
    (5, 132),
    (2, 144),
    (8, 156),
    (9, 168),
    (6, 180),
    (11, 192),
    (12, 204),
    (17, 216),
    (18, 228),
    (32, 240),
];

fn create_tree() -> (BTree, TempDir) {
    let dir = tempdir().unwrap();
    let tree = BTree::create(dir.path().join("scenario.idx"), TreeConfig::default()).unwrap();
    (tree, dir)
}

fn all_pairs() -> Vec<(i64, i64)> {
    FIRST_FIVE
        .iter()
        .chain(std::iter::once(&(19, 84)))
        .chain(REST.iter())
        .copied()
        .collect()
}

/// Test the first five keys stay in a single root leaf.
#[test]
fn test_first_five_fill_root_leaf() {
    let (mut tree, _dir) = create_tree();
    for (key, value) in FIRST_FIVE {
        assert_eq!(tree.insert(key, value).unwrap(), SlotId::ROOT);
    }

    let root = tree.read_slot(SlotId::ROOT).unwrap();
    assert_eq!(root.kind(), Some(NodeKind::Leaf));
    let keys: Vec<i64> = root.entries().iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![3, 7, 10, 14, 24]);

    let shape = tree.verify().unwrap();
    assert_eq!(shape.height, 1);
    assert_eq!(shape.free_slots, 9);
}

/// Test the sixth key splits the root into a two-entry internal node.
#[test]
fn test_sixth_key_promotes_internal_root() {
    let (mut tree, _dir) = create_tree();
    for (key, value) in FIRST_FIVE {
        tree.insert(key, value).unwrap();
    }
    tree.insert(19, 84).unwrap();

    assert_eq!(
        tree.read_slot(SlotId::ROOT).unwrap(),
        Slot::internal(vec![
            Entry::child(10, SlotId::new(2)),
            Entry::child(24, SlotId::new(3)),
        ])
    );
    let shape = tree.verify().unwrap();
    assert_eq!(shape.height, 2);
    assert_eq!(shape.leaf_count, 2);
}

/// Test the full insert sequence keeps every invariant after each step.
#[test]
fn test_full_sequence_stays_balanced() {
    let (mut tree, _dir) = create_tree();
    let pairs = all_pairs();

    for (i, &(key, value)) in pairs.iter().enumerate() {
        tree.insert(key, value).unwrap();
        let shape = tree.verify().unwrap();
        assert_eq!(shape.key_count, i + 1);

        for &(seen, expected) in &pairs[..=i] {
            assert_eq!(tree.search(seen).unwrap(), Some(expected));
        }
    }

    let shape = tree.verify().unwrap();
    assert_eq!(shape.height, 3);
    assert_eq!(shape.key_count, 19);
    assert_eq!(tree.len().unwrap(), 19);
}

/// Test removing 10, 9 and 8 leaves every other key reachable.
#[test]
fn test_remove_three_keys() {
    let (mut tree, _dir) = create_tree();
    let pairs = all_pairs();
    for &(key, value) in &pairs {
        tree.insert(key, value).unwrap();
    }

    for key in [10, 9, 8] {
        assert!(tree.remove(key).unwrap());
        tree.verify().unwrap();
    }

    for key in [10, 9, 8] {
        assert_eq!(tree.search(key).unwrap(), None);
    }
    for &(key, value) in pairs.iter().filter(|(k, _)| ![10, 9, 8].contains(k)) {
        assert_eq!(tree.search(key).unwrap(), Some(value));
    }
    assert_eq!(tree.len().unwrap(), 16);
}

/// Test the dump prints every slot, the last one included.
#[test]
fn test_dump_shows_every_slot() {
    let (mut tree, _dir) = create_tree();
    for &(key, value) in &all_pairs() {
        tree.insert(key, value).unwrap();
    }

    let text = tree.dump().unwrap().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines.iter().all(|line| line.len() == 55));
    // Root slot: internal status in the first cell.
    assert!(lines[1].starts_with("1    "));
}
