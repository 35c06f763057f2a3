//! B-tree index over the slot file.
//!
//! # Layout
//! ```text
//! slot 0   header     -1 <free-list head> ...
//! slot 1   root       status k1 v1 k2 v2 ... (always the root)
//! slot 2.. nodes      leaves hold (key, reference)
//!                     internal nodes hold (max key of child, child slot)
//! ```
//! Every structural change is written through to the file before the call
//! returns; nothing is cached between calls.

mod delete;
mod dump;
mod insert;
mod shared;
mod tree;
mod verify;

pub use dump::SlotDump;
pub use shared::SharedBTree;
pub use tree::BTree;
pub use verify::TreeShape;
