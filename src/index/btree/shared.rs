//! Thread-safe wrapper around [`BTree`].

use std::path::Path;

use parking_lot::RwLock;

use crate::common::{Result, SlotId, TreeConfig};

use super::dump::SlotDump;
use super::tree::BTree;
use super::verify::TreeShape;

/// A [`BTree`] shared between threads.
///
/// # Thread Safety
/// - `search`, `len`, `dump`, `verify`: read lock, run concurrently
/// - `insert`, `remove`: write lock, one mutation at a time
///
/// A mutation is never observed half-done: readers wait until the whole
/// split or merge cascade has been written.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::thread;
/// use slotindex::{SharedBTree, TreeConfig};
///
/// let tree = Arc::new(SharedBTree::create("index.db", TreeConfig::default()).unwrap());
/// let writer = {
///     let tree = Arc::clone(&tree);
///     thread::spawn(move || tree.insert(1, 100).unwrap())
/// };
/// writer.join().unwrap();
/// assert_eq!(tree.search(1).unwrap(), Some(100));
/// ```
pub struct SharedBTree {
    inner: RwLock<BTree>,
}

impl SharedBTree {
    pub fn new(tree: BTree) -> Self {
        Self {
            inner: RwLock::new(tree),
        }
    }

    /// Create a tree file at `path` and wrap it.
    pub fn create<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        BTree::create(path, config).map(Self::new)
    }

    pub fn search(&self, key: i64) -> Result<Option<i64>> {
        self.inner.read().search(key)
    }

    pub fn insert(&self, key: i64, value: i64) -> Result<SlotId> {
        self.inner.write().insert(key, value)
    }

    pub fn remove(&self, key: i64) -> Result<bool> {
        self.inner.write().remove(key)
    }

    pub fn len(&self) -> Result<usize> {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.inner.read().is_empty()
    }

    pub fn dump(&self) -> Result<SlotDump> {
        self.inner.read().dump()
    }

    pub fn verify(&self) -> Result<TreeShape> {
        self.inner.read().verify()
    }

    /// Unwrap the tree, giving back exclusive ownership.
    pub fn into_inner(self) -> BTree {
        self.inner.into_inner()
    }
}
