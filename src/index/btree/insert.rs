//! Insertion: leaf insert, node and root splits, ancestor propagation.
//!
//! An insert that overflows a leaf may split every node on its path. The
//! number of slots that cascade needs is counted before anything is
//! written, so a refused insert leaves the file untouched.

use tracing::{debug, warn};

use crate::common::{Error, Result, SlotId};
use crate::storage::slot::{Entry, NodeKind};

use super::tree::{BTree, SearchPath};

impl BTree {
    /// Insert `key -> value`, returning the slot of the leaf that holds it.
    ///
    /// An existing key has its value replaced in place.
    ///
    /// # Errors
    /// - `Error::SlotsExhausted` if the splits this insert requires need
    ///   more free slots than remain; the tree is left unchanged
    /// - `Error::ValueOverflow` if the key or value does not fit in a cell
    /// - `Error::ReservedEntry` for the pair `(-1, -1)`
    pub fn insert(&mut self, key: i64, value: i64) -> Result<SlotId> {
        let entry = Entry::new(key, value);
        if entry.is_unused_marker() {
            return Err(Error::ReservedEntry { key, value });
        }
        let codec = self.store.format().codec();
        codec.check(key)?;
        codec.check(value)?;

        if self.store.is_empty(SlotId::ROOT)? {
            self.free_list().claim(SlotId::ROOT)?;
            self.store
                .write_occupied(SlotId::ROOT, NodeKind::Leaf, vec![entry])?;
            return Ok(SlotId::ROOT);
        }

        let path = self.descend(key)?;
        let mut entries = self.store.read_node(path.leaf)?;
        let index = match entries.binary_search_by_key(&key, |e| e.key) {
            Ok(existing) => {
                entries[existing].value = value;
                self.store.write_node(path.leaf, &entries)?;
                return Ok(path.leaf);
            }
            Err(index) => index,
        };
        entries.insert(index, entry);

        if entries.len() <= self.fanout() {
            self.store.write_node(path.leaf, &entries)?;
            self.propagate_insert(&path, None)?;
            return Ok(path.leaf);
        }

        let needed = self.slots_needed(&path)?;
        if !self.free_list().has_at_least(needed)? {
            let available = self.free_list().count()?;
            warn!(key, needed, available, "insert refused: not enough free slots");
            return Err(Error::SlotsExhausted { needed, available });
        }

        // The new entry lands in the upper half if it sits at or past the midpoint.
        let in_upper = index >= entries.len() / 2;

        if path.leaf.is_root() {
            let (lower, upper) = self.split_root(entries)?;
            return Ok(if in_upper { upper } else { lower });
        }

        let sibling = self.split_node(path.leaf, entries)?;
        self.propagate_insert(&path, Some(sibling))?;

        Ok(if in_upper { sibling } else { path.leaf })
    }

    /// Free slots the split cascade of an overflowing leaf will consume.
    ///
    /// Each overflowing non-root node takes one slot for its new sibling and
    /// hands one more entry to its parent; an overflowing root takes two.
    fn slots_needed(&self, path: &SearchPath) -> Result<usize> {
        let mut needed = 0;
        let mut overflowing = path.leaf;
        let mut parents = path.ancestors.iter().rev();

        loop {
            if overflowing.is_root() {
                return Ok(needed + 2);
            }
            needed += 1;
            match parents.next() {
                Some(&parent) if self.store.read_node(parent)?.len() >= self.fanout() => {
                    overflowing = parent;
                }
                _ => return Ok(needed),
            }
        }
    }

    /// Walk the ancestors bottom-up, folding each split into the level above.
    fn propagate_insert(&self, path: &SearchPath, mut sibling: Option<SlotId>) -> Result<()> {
        for &ancestor in path.ancestors.iter().rev() {
            sibling = self.update_after_insert(ancestor, sibling)?;
        }
        debug_assert!(sibling.is_none(), "split escaped the root");
        Ok(())
    }

    /// Refresh a parent's separators and add the entry for a new child.
    ///
    /// Returns the parent's own new sibling if it had to split.
    fn update_after_insert(&self, parent: SlotId, new_child: Option<SlotId>) -> Result<Option<SlotId>> {
        let mut entries = self.recompute_entries(parent)?;
        if let Some(child) = new_child {
            entries.push(Entry::child(self.store.max_key(child)?, child));
            entries.sort_by_key(|e| e.key);
        }

        if entries.len() > self.fanout() {
            if parent.is_root() {
                self.split_root(entries)?;
                return Ok(None);
            }
            return self.split_node(parent, entries).map(Some);
        }

        self.store.write_node(parent, &entries)?;
        Ok(None)
    }

    fn kind_of(&self, slot: SlotId) -> Result<NodeKind> {
        self.store.kind(slot)?.ok_or_else(|| Error::CorruptNode {
            slot: slot.0,
            reason: "split of a free slot".into(),
        })
    }

    /// Split an overflowing non-root node at the midpoint.
    ///
    /// The lower half stays in `slot`; the upper half moves to a newly
    /// allocated slot of the same kind, which is returned.
    fn split_node(&self, slot: SlotId, mut entries: Vec<Entry>) -> Result<SlotId> {
        let kind = self.kind_of(slot)?;
        let sibling = self.free_list().allocate()?;

        let upper = entries.split_off(entries.len() / 2);
        debug!(
            slot = slot.0,
            sibling = sibling.0,
            lower = entries.len(),
            upper = upper.len(),
            "split node"
        );

        self.store.write_occupied(slot, kind, entries)?;
        self.store.write_occupied(sibling, kind, upper)?;

        Ok(sibling)
    }

    /// Split an overflowing root.
    ///
    /// Both halves move to new slots with the root's former kind, and the
    /// root becomes an internal node over them. Returns the two new slots.
    fn split_root(&self, mut entries: Vec<Entry>) -> Result<(SlotId, SlotId)> {
        let kind = self.kind_of(SlotId::ROOT)?;
        let lower_slot = self.free_list().allocate()?;
        let upper_slot = self.free_list().allocate()?;

        let upper = entries.split_off(entries.len() / 2);
        let lower = entries;
        let root = vec![
            Entry::child(max_of(&lower)?, lower_slot),
            Entry::child(max_of(&upper)?, upper_slot),
        ];
        debug!(
            lower = lower_slot.0,
            upper = upper_slot.0,
            was_leaf = kind == NodeKind::Leaf,
            "split root"
        );

        self.store.write_occupied(lower_slot, kind, lower)?;
        self.store.write_occupied(upper_slot, kind, upper)?;
        self.store
            .write_occupied(SlotId::ROOT, NodeKind::Internal, root)?;

        Ok((lower_slot, upper_slot))
    }
}

fn max_of(entries: &[Entry]) -> Result<i64> {
    entries
        .last()
        .map(|e| e.key)
        .ok_or_else(|| Error::CorruptNode {
            slot: SlotId::ROOT.0,
            reason: "root split produced an empty half".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TreeConfig;
    use crate::storage::slot::Slot;
    use tempfile::{tempdir, TempDir};

    fn create_tree(config: TreeConfig) -> (BTree, TempDir) {
        let dir = tempdir().unwrap();
        let tree = BTree::create(dir.path().join("tree.idx"), config).unwrap();
        (tree, dir)
    }

    fn leaf(pairs: &[(i64, i64)]) -> Slot {
        Slot::leaf(pairs.iter().map(|&(k, v)| Entry::new(k, v)).collect())
    }

    fn internal(pairs: &[(i64, u32)]) -> Slot {
        Slot::internal(
            pairs
                .iter()
                .map(|&(k, s)| Entry::child(k, SlotId::new(s)))
                .collect(),
        )
    }

    #[test]
    fn test_first_insert_claims_root() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());

        assert_eq!(tree.insert(3, 12).unwrap(), SlotId::ROOT);
        assert_eq!(tree.read_slot(SlotId::ROOT).unwrap(), leaf(&[(3, 12)]));
        // Slot 1 came off the free list.
        assert_eq!(tree.free_list().head().unwrap(), Some(SlotId::new(2)));
        assert_eq!(tree.free_slot_count().unwrap(), 9);
    }

    #[test]
    fn test_fill_root_leaf_sorted() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        for (key, value) in [(3, 12), (7, 24), (10, 48), (24, 60), (14, 72)] {
            assert_eq!(tree.insert(key, value).unwrap(), SlotId::ROOT);
        }

        assert_eq!(
            tree.read_slot(SlotId::ROOT).unwrap(),
            leaf(&[(3, 12), (7, 24), (10, 48), (14, 72), (24, 60)])
        );
    }

    #[test]
    fn test_root_leaf_split() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        for (key, value) in [(3, 12), (7, 24), (10, 48), (24, 60), (14, 72)] {
            tree.insert(key, value).unwrap();
        }

        assert_eq!(tree.insert(19, 84).unwrap(), SlotId::new(3));

        assert_eq!(
            tree.read_slot(SlotId::ROOT).unwrap(),
            internal(&[(10, 2), (24, 3)])
        );
        assert_eq!(
            tree.read_slot(SlotId::new(2)).unwrap(),
            leaf(&[(3, 12), (7, 24), (10, 48)])
        );
        assert_eq!(
            tree.read_slot(SlotId::new(3)).unwrap(),
            leaf(&[(14, 72), (19, 84), (24, 60)])
        );
        assert_eq!(tree.free_list().head().unwrap(), Some(SlotId::new(4)));
    }

    #[test]
    fn test_leaf_split_adds_parent_entry() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        for (key, value) in [(3, 12), (7, 24), (10, 48), (24, 60), (14, 72), (19, 84)] {
            tree.insert(key, value).unwrap();
        }
        for (key, value) in [(30, 96), (15, 108), (1, 120), (5, 132)] {
            tree.insert(key, value).unwrap();
        }
        // [1 3 5 7 10] [14 15 19 24 30]
        assert_eq!(
            tree.read_slot(SlotId::ROOT).unwrap(),
            internal(&[(10, 2), (30, 3)])
        );

        // Overflows slot 2: [1 2 3] stay, [5 7 10] move to slot 4.
        assert_eq!(tree.insert(2, 144).unwrap(), SlotId::new(2));
        assert_eq!(
            tree.read_slot(SlotId::ROOT).unwrap(),
            internal(&[(3, 2), (10, 4), (30, 3)])
        );
        assert_eq!(
            tree.read_slot(SlotId::new(4)).unwrap(),
            leaf(&[(5, 132), (7, 24), (10, 48)])
        );
    }

    #[test]
    fn test_insert_past_maximum_updates_separator() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        for key in [3, 7, 10, 24, 14, 19] {
            tree.insert(key, key).unwrap();
        }
        tree.insert(99, 1).unwrap();

        assert_eq!(
            tree.read_slot(SlotId::ROOT).unwrap(),
            internal(&[(10, 2), (99, 3)])
        );
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        tree.insert(5, 50).unwrap();
        tree.insert(6, 60).unwrap();
        tree.insert(5, 55).unwrap();

        assert_eq!(tree.search(5).unwrap(), Some(55));
        assert_eq!(tree.read_slot(SlotId::ROOT).unwrap(), leaf(&[(5, 55), (6, 60)]));
    }

    #[test]
    fn test_internal_root_split_grows_height() {
        // fanout 3: root leaf splits at 4 keys, root internal at 4 children.
        let (mut tree, _dir) = create_tree(TreeConfig::new(20, 3, 4));
        for key in 1..=12 {
            tree.insert(key, key * 10).unwrap();
        }

        let shape = tree.verify().unwrap();
        assert_eq!(shape.height, 3);
        for key in 1..=12 {
            assert_eq!(tree.search(key).unwrap(), Some(key * 10));
        }
    }

    #[test]
    fn test_insert_returns_holding_leaf() {
        let (mut tree, _dir) = create_tree(TreeConfig::new(99, 4, 4));
        for key in 0..40 {
            let slot = tree.insert(key, key).unwrap();
            let holder = tree.read_slot(slot).unwrap();
            assert!(holder.entries().iter().any(|e| e.key == key));
            assert_eq!(holder.kind(), Some(NodeKind::Leaf));
        }
    }

    #[test]
    fn test_exhaustion_leaves_file_untouched() {
        // 3 slots: the root plus room for exactly one root split.
        let (mut tree, _dir) = create_tree(TreeConfig::new(3, 2, 3));
        tree.insert(1, 1).unwrap();
        tree.insert(2, 2).unwrap();
        tree.insert(3, 3).unwrap(); // root split: [1] in slot 2, [2 3] in slot 3
        tree.insert(0, 0).unwrap(); // fits in slot 2
        assert_eq!(tree.free_slot_count().unwrap(), 0);

        // Slot 3 and then the root would both split.
        let before = tree.dump().unwrap();
        let err = tree.insert(5, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::SlotsExhausted {
                needed: 3,
                available: 0
            }
        ));
        assert_eq!(tree.dump().unwrap().checksum(), before.checksum());
        assert_eq!(tree.dump().unwrap(), before);
        assert_eq!(tree.search(5).unwrap(), None);

        // Overwriting an existing key needs no slot.
        tree.insert(3, 30).unwrap();
        assert_eq!(tree.search(3).unwrap(), Some(30));
    }

    #[test]
    fn test_exhaustion_counts_cascade() {
        let (mut tree, _dir) = create_tree(TreeConfig::new(2, 2, 3));
        tree.insert(1, 1).unwrap();
        tree.insert(2, 2).unwrap();

        // A root split needs two slots; only slot 2 is free.
        let before = tree.dump().unwrap();
        assert!(matches!(
            tree.insert(3, 3),
            Err(Error::SlotsExhausted {
                needed: 2,
                available: 1
            })
        ));
        assert_eq!(tree.dump().unwrap(), before);
    }

    #[test]
    fn test_insert_rejects_unrepresentable() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        assert!(matches!(
            tree.insert(123456, 1),
            Err(Error::ValueOverflow { value: 123456, .. })
        ));
        assert!(matches!(
            tree.insert(1, -12345),
            Err(Error::ValueOverflow { .. })
        ));
        assert!(matches!(
            tree.insert(-1, -1),
            Err(Error::ReservedEntry { .. })
        ));
        assert!(tree.is_empty().unwrap());
    }

    #[test]
    fn test_negative_keys() {
        let (mut tree, _dir) = create_tree(TreeConfig::default());
        for key in [-50, -1, 0, 7, -3, 12, -999] {
            tree.insert(key, key + 1000).unwrap();
        }
        for key in [-50, -1, 0, 7, -3, 12, -999] {
            assert_eq!(tree.search(key).unwrap(), Some(key + 1000));
        }
        tree.verify().unwrap();
    }
}
