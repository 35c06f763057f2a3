//! slotindex - A disk-backed B-tree index over fixed-width text slots.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           slotindex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BTree: search / insert / remove / verify / dump        │   │
//! │  │   SharedBTree: RwLock around a BTree                     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     NodeStore + FreeList over a SlotFile                 │   │
//! │  │     SlotFormat + CellCodec (fixed-width decimal cells)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # File Format
//! The file holds `num_records + 1` slots of `1 + 2 * fanout` cells. Each
//! cell is a left-justified decimal integer padded with spaces to
//! `cell_size` bytes. Cell 0 of a slot is its status (`-1` free, `0` leaf,
//! `1` internal); the rest are `(key, value)` pairs, `(-1, -1)` when unused.
//!
//! # Modules
//! - [`common`] - Shared primitives (SlotId, Error, TreeConfig)
//! - [`storage`] - Slot file I/O, slot formats, free-slot allocation
//! - [`index`] - The B-tree itself
//!
//! # Quick Start
//! ```no_run
//! use slotindex::{BTree, TreeConfig};
//!
//! // fanout 5, 10 node slots, 5-byte cells
//! let mut tree = BTree::create("my_index.db", TreeConfig::default()).unwrap();
//!
//! tree.insert(3, 12).unwrap();
//! assert_eq!(tree.search(3).unwrap(), Some(12));
//! println!("{}", tree.dump().unwrap());
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{Error, Result, SlotId, TreeConfig};

pub use index::{BTree, SharedBTree, SlotDump, TreeShape};
pub use storage::slot::{Entry, NodeKind, Slot};
