//! Storage layer - slot file I/O and slot formats.
//!
//! This module handles persistent storage:
//! - [`SlotFile`] - Low-level file I/O
//! - [`NodeStore`] - Tree nodes addressed by slot
//! - [`FreeList`] - Allocation of unused slots
//! - [`slot`] - Cell codec and slot layout

mod free_list;
mod node_store;
pub mod slot;
mod slot_file;

pub use free_list::FreeList;
pub use node_store::NodeStore;
pub use slot_file::SlotFile;
