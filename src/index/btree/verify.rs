//! Consistency checker for the on-disk tree.

use std::collections::HashSet;

use crate::common::{Error, Result, SlotId};
use crate::storage::slot::{NodeKind, Slot};

use super::tree::BTree;

/// Summary of a tree that passed [`BTree::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels from the root to the leaves; 1 for a leaf root, 0 when empty.
    pub height: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    pub key_count: usize,
    pub free_slots: usize,
}

/// State carried through the depth-first walk.
struct Walk<'t> {
    tree: &'t BTree,
    live: HashSet<SlotId>,
    leaf_depth: Option<usize>,
    last_key: Option<i64>,
    shape: TreeShape,
}

fn violation(message: String) -> Error {
    Error::InvariantViolation(message)
}

impl Walk<'_> {
    /// Check the subtree rooted at `slot` and return its maximum key.
    fn visit(&mut self, slot: SlotId, depth: usize) -> Result<i64> {
        if depth > self.tree.config().num_records as usize {
            return Err(violation(format!("{slot} is deeper than the slot count")));
        }
        if !self.live.insert(slot) {
            return Err(violation(format!("{slot} is reachable twice")));
        }

        let (kind, entries) = match self.tree.store.read_slot(slot)? {
            Slot::Occupied { kind, entries } => (kind, entries),
            Slot::Free { .. } => {
                return Err(violation(format!("{slot} is referenced but free")));
            }
        };

        let Some(max) = entries.last().map(|e| e.key) else {
            return Err(violation(format!("{slot} is an empty live node")));
        };
        if entries.windows(2).any(|pair| pair[0].key >= pair[1].key) {
            return Err(violation(format!("{slot} keys are not strictly ascending")));
        }
        if !slot.is_root() && entries.len() < self.tree.min_entries() {
            return Err(violation(format!(
                "{slot} holds {} entries, minimum is {}",
                entries.len(),
                self.tree.min_entries()
            )));
        }

        match kind {
            NodeKind::Leaf => {
                match self.leaf_depth {
                    None => self.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(violation(format!(
                            "{slot} is a leaf at depth {depth}, others are at {expected}"
                        )));
                    }
                    Some(_) => {}
                }
                for entry in &entries {
                    if self.last_key.is_some_and(|last| last >= entry.key) {
                        return Err(violation(format!(
                            "key {} in {slot} is out of order across leaves",
                            entry.key
                        )));
                    }
                    self.last_key = Some(entry.key);
                }
                self.shape.leaf_count += 1;
                self.shape.key_count += entries.len();
            }
            NodeKind::Internal => {
                for entry in &entries {
                    let child = self.tree.store.child_of(entry)?;
                    let child_max = self.visit(child, depth + 1)?;
                    if child_max != entry.key {
                        return Err(violation(format!(
                            "{slot} records key {} for {child}, whose maximum is {child_max}",
                            entry.key
                        )));
                    }
                }
                self.shape.internal_count += 1;
            }
        }

        Ok(max)
    }
}

impl BTree {
    /// Walk the whole file and check every structural invariant.
    ///
    /// Checks that keys ascend strictly within and across nodes, that all
    /// leaves share one depth, that non-root nodes hold at least
    /// `fanout / 2` entries, that every internal key equals its child's
    /// maximum, and that the free list is exactly the set of slots marked
    /// free.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first problem
    /// found, or a decoding error if a slot cannot be read at all.
    pub fn verify(&self) -> Result<TreeShape> {
        let listed = self.free_list().slots()?;
        let free: HashSet<SlotId> = listed.iter().copied().collect();
        if free.len() != listed.len() {
            return Err(violation("free list visits a slot twice".into()));
        }

        let num_records = self.config().num_records;
        for i in 1..=num_records {
            let slot = SlotId::new(i);
            let marked = self.store.read_slot(slot)?.is_free();
            if marked != free.contains(&slot) {
                return Err(violation(if marked {
                    format!("{slot} is marked free but not on the free list")
                } else {
                    format!("{slot} is on the free list but occupied")
                }));
            }
        }

        let mut walk = Walk {
            tree: self,
            live: HashSet::new(),
            leaf_depth: None,
            last_key: None,
            shape: TreeShape {
                free_slots: free.len(),
                ..TreeShape::default()
            },
        };

        if !free.contains(&SlotId::ROOT) {
            walk.visit(SlotId::ROOT, 1)?;
        }

        let accounted = walk.live.len() + free.len();
        if accounted != num_records as usize {
            return Err(violation(format!(
                "{} slots are neither reachable nor free",
                num_records as usize - accounted
            )));
        }

        walk.shape.height = walk.leaf_depth.unwrap_or(0);
        Ok(walk.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TreeConfig;
    use crate::storage::slot::Entry;
    use tempfile::{tempdir, TempDir};

    fn create_tree(config: TreeConfig) -> (BTree, TempDir) {
        let dir = tempdir().unwrap();
        let tree = BTree::create(dir.path().join("tree.idx"), config).unwrap();
        (tree, dir)
    }

    fn two_leaf_tree() -> (BTree, TempDir) {
        let (mut tree, dir) = create_tree(TreeConfig::default());
        for key in [3, 7, 10, 24, 14, 19] {
            tree.insert(key, key * 10).unwrap();
        }
        (tree, dir)
    }

    fn assert_violation(tree: &BTree, needle: &str) {
        match tree.verify() {
            Err(Error::InvariantViolation(message)) => {
                assert!(message.contains(needle), "unexpected message: {message}")
            }
            other => panic!("expected a violation, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_tree_shape() {
        let (tree, _dir) = create_tree(TreeConfig::default());
        assert_eq!(
            tree.verify().unwrap(),
            TreeShape {
                free_slots: 10,
                ..TreeShape::default()
            }
        );
    }

    #[test]
    fn test_two_leaf_shape() {
        let (tree, _dir) = two_leaf_tree();
        assert_eq!(
            tree.verify().unwrap(),
            TreeShape {
                height: 2,
                leaf_count: 2,
                internal_count: 1,
                key_count: 6,
                free_slots: 7,
            }
        );
    }

    #[test]
    fn test_detects_stale_separator() {
        let (tree, _dir) = two_leaf_tree();
        tree.store
            .write_node(
                SlotId::ROOT,
                &[Entry::child(9, SlotId::new(2)), Entry::child(24, SlotId::new(3))],
            )
            .unwrap();
        assert_violation(&tree, "whose maximum is 10");
    }

    #[test]
    fn test_detects_unsorted_leaf() {
        let (tree, _dir) = two_leaf_tree();
        tree.store
            .write_node(
                SlotId::new(2),
                &[Entry::new(7, 1), Entry::new(3, 1), Entry::new(10, 1)],
            )
            .unwrap();
        assert_violation(&tree, "not strictly ascending");
    }

    #[test]
    fn test_detects_underfull_node() {
        let (tree, _dir) = two_leaf_tree();
        tree.store
            .write_node(SlotId::new(2), &[Entry::new(10, 1)])
            .unwrap();
        assert_violation(&tree, "minimum is 2");
    }

    #[test]
    fn test_detects_leaked_slot() {
        let (tree, _dir) = two_leaf_tree();
        // Take slot 4 off the list without linking it into the tree.
        tree.free_list().allocate().unwrap();
        assert_violation(&tree, "marked free but not on the free list");

        tree.store
            .write_slot(SlotId::new(4), &Slot::leaf(vec![Entry::new(1, 1)]))
            .unwrap();
        assert_violation(&tree, "neither reachable nor free");
    }

    #[test]
    fn test_detects_live_slot_on_free_list() {
        let (tree, _dir) = two_leaf_tree();
        tree.store
            .write_slot(SlotId::HEADER, &Slot::Free { next: Some(SlotId::new(3)) })
            .unwrap();
        assert!(tree.verify().is_err());
    }
}
