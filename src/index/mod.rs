//! Index structures.
//!
//! - [`btree`] - B-tree over fixed-width slots

pub mod btree;

pub use btree::{BTree, SharedBTree, SlotDump, TreeShape};
