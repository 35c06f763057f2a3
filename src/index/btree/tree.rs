//! The [`BTree`] handle: construction, lookup, and shared node helpers.
//!
//! Insertion lives in `insert.rs`, deletion in `delete.rs`, and the
//! consistency checker in `verify.rs`; all of them extend this type.

use std::path::Path;

use tracing::{info, trace};

use crate::common::{Error, Result, SlotId, TreeConfig};
use crate::storage::slot::{Entry, NodeKind, Slot};
use crate::storage::{FreeList, NodeStore, SlotFile};

use super::dump::SlotDump;

/// Slots visited from the root down to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchPath {
    /// The leaf that holds (or would hold) the key.
    pub leaf: SlotId,
    /// Internal nodes passed on the way, root first.
    pub ancestors: Vec<SlotId>,
}

impl SearchPath {
    /// The leaf's parent, or `None` if the leaf is the root.
    pub fn parent(&self) -> Option<SlotId> {
        self.ancestors.last().copied()
    }
}

/// A B-tree index mapping integer keys to integer references.
///
/// The whole tree lives in a slot file; no node is cached in memory
/// between calls. Slot 1 is always the root.
///
/// # Thread Safety
/// Lookups take `&self`, mutations take `&mut self`. Wrap the tree in a
/// [`SharedBTree`](super::SharedBTree) to use it from several threads.
///
/// # Example
/// ```no_run
/// use slotindex::{BTree, TreeConfig};
///
/// let mut tree = BTree::create("index.db", TreeConfig::default()).unwrap();
/// tree.insert(3, 12).unwrap();
/// assert_eq!(tree.search(3).unwrap(), Some(12));
/// tree.remove(3).unwrap();
/// assert_eq!(tree.search(3).unwrap(), None);
/// ```
pub struct BTree {
    pub(crate) store: NodeStore,
    config: TreeConfig,
}

impl BTree {
    /// Create a tree file at `path`, discarding any previous contents.
    ///
    /// Every slot starts free, chained in ascending order.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` / `Error::ValueOverflow` for a bad geometry
    /// - I/O errors from creating or formatting the file
    pub fn create<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        config.validate()?;

        let file = SlotFile::create(path.as_ref(), &config)?;
        let store = NodeStore::new(file);
        FreeList::new(&store).initialize()?;

        info!(
            path = %path.as_ref().display(),
            num_records = config.num_records,
            fanout = config.fanout,
            cell_size = config.cell_size,
            "created tree file"
        );

        Ok(Self { store, config })
    }

    /// The geometry this tree was created with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn fanout(&self) -> usize {
        self.config.fanout
    }

    #[inline]
    pub(crate) fn min_entries(&self) -> usize {
        self.config.min_entries()
    }

    #[inline]
    pub(crate) fn free_list(&self) -> FreeList<'_> {
        FreeList::new(&self.store)
    }

    /// Look up the reference stored for `key`.
    ///
    /// Returns `Ok(None)` if the key is not in the tree.
    pub fn search(&self, key: i64) -> Result<Option<i64>> {
        if self.store.is_empty(SlotId::ROOT)? {
            return Ok(None);
        }

        let path = self.descend(key)?;
        let found = self
            .store
            .read_node(path.leaf)?
            .into_iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value);

        Ok(found)
    }

    /// Walk from the root to the leaf responsible for `key`.
    ///
    /// At each internal node the first entry whose key is `>= key` is
    /// followed; keys above every subtree maximum follow the last entry.
    pub(crate) fn descend(&self, key: i64) -> Result<SearchPath> {
        let mut ancestors = Vec::new();
        let mut current = SlotId::ROOT;

        loop {
            let entries = match self.store.read_slot(current)? {
                Slot::Occupied {
                    kind: NodeKind::Leaf,
                    ..
                } => break,
                Slot::Occupied {
                    kind: NodeKind::Internal,
                    entries,
                } => entries,
                Slot::Free { .. } => {
                    return Err(Error::CorruptNode {
                        slot: current.0,
                        reason: "descent reached a free slot".into(),
                    })
                }
            };

            if ancestors.len() >= self.config.num_records as usize {
                return Err(Error::CorruptNode {
                    slot: current.0,
                    reason: "descent does not reach a leaf".into(),
                });
            }

            let next = entries
                .iter()
                .find(|entry| entry.key >= key)
                .or_else(|| entries.last())
                .ok_or_else(|| Error::CorruptNode {
                    slot: current.0,
                    reason: "internal node has no entries".into(),
                })?;

            ancestors.push(current);
            current = self.store.child_of(next)?;
        }

        trace!(key, leaf = current.0, depth = ancestors.len(), "descended");
        Ok(SearchPath {
            leaf: current,
            ancestors,
        })
    }

    /// Re-derive `(max key of child, child)` for every live child of `parent`.
    ///
    /// Children that were released to the free list are dropped.
    pub(crate) fn recompute_entries(&self, parent: SlotId) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in self.store.read_node(parent)? {
            let child = self.store.child_of(&entry)?;
            if let Some(last) = self.store.read_node(child)?.last() {
                entries.push(Entry::child(last.key, child));
            }
        }
        entries.sort_by_key(|entry| entry.key);
        Ok(entries)
    }

    /// Decoded contents of one slot, for inspection.
    pub fn read_slot(&self, slot: SlotId) -> Result<Slot> {
        self.store.read_slot(slot)
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty(SlotId::ROOT)
    }

    /// Number of keys in the tree, counted by walking every leaf.
    pub fn len(&self) -> Result<usize> {
        if self.is_empty()? {
            return Ok(0);
        }

        let mut count = 0;
        let mut pending = vec![SlotId::ROOT];
        let mut visited = 0usize;
        while let Some(slot) = pending.pop() {
            visited += 1;
            if visited > self.config.num_records as usize {
                return Err(Error::CorruptNode {
                    slot: slot.0,
                    reason: "tree has more nodes than slots".into(),
                });
            }
            match self.store.read_slot(slot)? {
                Slot::Occupied {
                    kind: NodeKind::Leaf,
                    entries,
                } => count += entries.len(),
                Slot::Occupied {
                    kind: NodeKind::Internal,
                    entries,
                } => {
                    for entry in &entries {
                        pending.push(self.store.child_of(entry)?);
                    }
                }
                Slot::Free { .. } => {
                    return Err(Error::CorruptNode {
                        slot: slot.0,
                        reason: "live node points at a free slot".into(),
                    })
                }
            }
        }
        Ok(count)
    }

    /// Number of slots on the free list.
    pub fn free_slot_count(&self) -> Result<usize> {
        self.free_list().count()
    }

    /// Raw text of every slot, header first.
    pub fn dump(&self) -> Result<SlotDump> {
        let data = self.store.file().read_all()?;
        Ok(SlotDump::new(self.store.format().slot_size(), data))
    }

    /// Decoded contents of every slot, header first.
    pub fn dump_slots(&self) -> Result<Vec<Slot>> {
        (0..=self.config.num_records)
            .map(|i| self.store.read_slot(SlotId::new(i)))
            .collect()
    }

    /// Flush the backing file to disk.
    pub fn sync(&self) -> Result<()> {
        self.store.file().sync()
    }
}
