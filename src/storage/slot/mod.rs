//! Slot types and layout.
//!
//! This module contains:
//! - [`CellCodec`] - Fixed-width decimal cells
//! - [`Slot`] - Decoded view of a slot (node or free-list link)
//! - [`SlotFormat`] - Whole-slot encoding for one tree geometry

mod codec;
#[allow(clippy::module_inception)]
mod slot;

pub use codec::CellCodec;
pub use slot::{Entry, NodeKind, Slot, SlotFormat};
