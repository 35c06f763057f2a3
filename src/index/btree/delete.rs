//! Deletion: leaf removal, underflow rebalancing, ancestor propagation.
//!
//! A node that drops below `fanout / 2` entries is rebalanced against a
//! sibling in the same parent:
//! 1. Redistribute: borrow one entry from the preceding sibling, or else
//!    from the next one, if the donor stays at or above the minimum.
//! 2. Merge: move all entries into the preceding sibling (the next one if
//!    the node is its parent's first child) and release the node's slot.
//!
//! Parents are then rewritten level by level up to the root. A merge at one
//! level can leave the parent short, which rebalances it against its own
//! parent in turn. Finally a root left with a single child absorbs it.

use tracing::debug;

use crate::common::{Error, Result, SlotId};
use crate::storage::slot::{Entry, NodeKind, Slot};

use super::tree::BTree;

/// Neighbours of a child within its parent's entry list.
struct Siblings {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl BTree {
    /// Remove `key` from the tree.
    ///
    /// Returns `false` if the key was not present (nothing is written).
    pub fn remove(&mut self, key: i64) -> Result<bool> {
        if self.store.is_empty(SlotId::ROOT)? {
            return Ok(false);
        }

        let path = self.descend(key)?;
        let mut entries = self.store.read_node(path.leaf)?;
        let Some(index) = entries.iter().position(|e| e.key == key) else {
            return Ok(false);
        };
        entries.remove(index);

        let Some(parent) = path.parent() else {
            // The root is a leaf: it never underflows, it only empties.
            if entries.is_empty() {
                self.free_list().release(SlotId::ROOT)?;
                debug!("tree emptied");
            } else {
                self.store.write_node(SlotId::ROOT, &entries)?;
            }
            return Ok(true);
        };

        if entries.len() < self.min_entries() {
            self.rebalance(parent, path.leaf, entries)?;
        } else {
            self.store.write_node(path.leaf, &entries)?;
        }

        for (depth, &ancestor) in path.ancestors.iter().enumerate().rev() {
            let grandparent = depth.checked_sub(1).map(|d| path.ancestors[d]);
            self.update_after_delete(ancestor, grandparent)?;
        }
        self.collapse_root()?;

        Ok(true)
    }

    /// Fix an underflowing `child` of `parent` whose new entries are `entries`.
    fn rebalance(&self, parent: SlotId, child: SlotId, entries: Vec<Entry>) -> Result<()> {
        let siblings = self.siblings(parent, child)?;
        if self.redistribute(&siblings, child, &entries)? {
            return Ok(());
        }
        self.merge(&siblings, child, entries)
    }

    /// Locate `child` in `parent` and return its neighbours.
    fn siblings(&self, parent: SlotId, child: SlotId) -> Result<Siblings> {
        let entries = self.store.read_node(parent)?;
        let position = entries
            .iter()
            .position(|e| e.value == child.as_value())
            .ok_or_else(|| Error::CorruptNode {
                slot: parent.0,
                reason: format!("no entry for child {}", child.0),
            })?;

        let prev = match position.checked_sub(1) {
            Some(i) => Some(self.store.child_of(&entries[i])?),
            None => None,
        };
        let next = match entries.get(position + 1) {
            Some(entry) => Some(self.store.child_of(entry)?),
            None => None,
        };
        Ok(Siblings { prev, next })
    }

    /// Borrow one entry from a sibling that can spare it.
    ///
    /// The preceding sibling gives up its largest entry, the next sibling
    /// its smallest. Returns `false` if neither sibling is above the minimum.
    fn redistribute(&self, siblings: &Siblings, child: SlotId, entries: &[Entry]) -> Result<bool> {
        let min = self.min_entries();

        if let Some(left) = siblings.prev {
            let mut donor = self.store.read_node(left)?;
            if donor.len() > min {
                if let Some(moved) = donor.pop() {
                    let mut refilled = entries.to_vec();
                    refilled.push(moved);
                    refilled.sort_by_key(|e| e.key);
                    self.store.write_node(child, &refilled)?;
                    self.store.write_node(left, &donor)?;
                    debug!(child = child.0, donor = left.0, key = moved.key, "redistributed from left");
                    return Ok(true);
                }
            }
        }

        if let Some(right) = siblings.next {
            let mut donor = self.store.read_node(right)?;
            if donor.len() > min {
                let moved = donor.remove(0);
                let mut refilled = entries.to_vec();
                refilled.push(moved);
                refilled.sort_by_key(|e| e.key);
                self.store.write_node(child, &refilled)?;
                self.store.write_node(right, &donor)?;
                debug!(child = child.0, donor = right.0, key = moved.key, "redistributed from right");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Fold `child` into a sibling and release its slot.
    ///
    /// The parent keeps its stale entry for `child` until the next
    /// propagation step drops it. A child with no sibling at all is
    /// released if empty and written back otherwise.
    fn merge(&self, siblings: &Siblings, child: SlotId, entries: Vec<Entry>) -> Result<()> {
        let Some(target) = siblings.prev.or(siblings.next) else {
            if entries.is_empty() {
                self.free_list().release(child)?;
            } else {
                self.store.write_node(child, &entries)?;
            }
            return Ok(());
        };

        let mut merged = self.store.read_node(target)?;
        let moved = entries.len();
        merged.extend(entries);
        merged.sort_by_key(|e| e.key);
        self.store.write_node(target, &merged)?;
        self.free_list().release(child)?;

        debug!(child = child.0, into = target.0, moved, "merged");
        Ok(())
    }

    /// Rewrite `parent` from its live children after a removal below it.
    ///
    /// If the parent now underflows and has a parent of its own, it is
    /// rebalanced against that grandparent.
    fn update_after_delete(&self, parent: SlotId, grandparent: Option<SlotId>) -> Result<()> {
        let entries = self.recompute_entries(parent)?;
        match grandparent {
            Some(grandparent) if entries.len() < self.min_entries() => {
                self.rebalance(grandparent, parent, entries)
            }
            _ => self.store.write_node(parent, &entries),
        }
    }

    /// Shrink the tree while the root is an internal node with one child.
    ///
    /// The child's contents move into slot 1 and the child is released.
    /// A root left with no entries at all empties the tree.
    fn collapse_root(&self) -> Result<()> {
        loop {
            let entries = match self.store.read_slot(SlotId::ROOT)? {
                Slot::Occupied {
                    kind: NodeKind::Internal,
                    entries,
                } if entries.len() <= 1 => entries,
                Slot::Occupied {
                    kind: NodeKind::Leaf,
                    entries,
                } if entries.is_empty() => Vec::new(),
                _ => return Ok(()),
            };

            let Some(only) = entries.first() else {
                self.free_list().release(SlotId::ROOT)?;
                debug!("tree emptied");
                return Ok(());
            };

            let child = self.store.child_of(only)?;
            let contents = self.store.read_slot(child)?;
            if contents.is_free() {
                return Err(Error::CorruptNode {
                    slot: SlotId::ROOT.0,
                    reason: format!("only child {} is free", child.0),
                });
            }
            self.store.write_slot(SlotId::ROOT, &contents)?;
            self.free_list().release(child)?;
            debug!(child = child.0, "collapsed root");
        }
    }
}
