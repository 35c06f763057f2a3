//! Node Store - tree nodes addressed by slot index.
//!
//! The [`NodeStore`] decodes slots from a [`SlotFile`] into entry lists and
//! writes them back. Node accessors accept only node slots (`1..=num_records`);
//! the header slot is reached through [`NodeStore::read_slot`] and
//! [`NodeStore::write_slot`], which the free list uses.

use crate::common::{Error, Result, SlotId};
use crate::storage::slot::{Entry, NodeKind, Slot, SlotFormat};
use crate::storage::SlotFile;

/// Read/write access to tree nodes.
pub struct NodeStore {
    file: SlotFile,
}

impl NodeStore {
    pub fn new(file: SlotFile) -> Self {
        Self { file }
    }

    #[inline]
    pub fn format(&self) -> &SlotFormat {
        self.file.format()
    }

    #[inline]
    pub fn fanout(&self) -> usize {
        self.format().fanout()
    }

    #[inline]
    pub fn num_records(&self) -> u32 {
        self.format().num_records()
    }

    #[inline]
    pub fn file(&self) -> &SlotFile {
        &self.file
    }

    fn validate_node_slot(&self, slot: SlotId) -> Result<()> {
        if slot.0 == 0 || slot.0 > self.num_records() {
            return Err(Error::InvalidSlot {
                slot: slot.as_value(),
                min: 1,
                max: self.num_records(),
            });
        }
        Ok(())
    }

    /// Read and decode any slot, the header included.
    pub fn read_slot(&self, slot: SlotId) -> Result<Slot> {
        let data = self.file.read_slot(slot)?;
        self.format().decode(slot, &data)
    }

    /// Encode and overwrite any slot, the header included.
    pub fn write_slot(&self, slot: SlotId, contents: &Slot) -> Result<()> {
        let data = self.format().encode(contents)?;
        self.file.write_slot(slot, &data)
    }

    /// Read the entries of a node slot. A free slot reads as empty.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` for the header or an out-of-range slot.
    pub fn read_node(&self, slot: SlotId) -> Result<Vec<Entry>> {
        self.validate_node_slot(slot)?;
        Ok(self.read_slot(slot)?.into_entries())
    }

    /// Replace the entries of a node slot, leaving its status cell alone.
    ///
    /// Entry positions past `entries.len()` are reset to `(-1, -1)`.
    ///
    /// # Errors
    /// - `Error::InvalidSlot` for the header or an out-of-range slot
    /// - `Error::InvalidEntry` if there are more entries than the fanout
    pub fn write_node(&self, slot: SlotId, entries: &[Entry]) -> Result<()> {
        self.validate_node_slot(slot)?;
        let data = self.format().encode_entries(entries)?;
        self.file.write_cells(slot, 1, &data)
    }

    /// Write a node slot in one go: status and entries.
    pub fn write_occupied(&self, slot: SlotId, kind: NodeKind, entries: Vec<Entry>) -> Result<()> {
        self.validate_node_slot(slot)?;
        self.write_slot(slot, &Slot::Occupied { kind, entries })
    }

    /// Rewrite the status cell of a node slot.
    pub fn set_kind(&self, slot: SlotId, kind: NodeKind) -> Result<()> {
        self.validate_node_slot(slot)?;
        let mut data = Vec::with_capacity(self.format().codec().cell_size());
        self.format().codec().encode_into(kind.status(), &mut data)?;
        self.file.write_cells(slot, 0, &data)
    }

    /// Node kind of a slot, or `None` if the slot is free.
    pub fn kind(&self, slot: SlotId) -> Result<Option<NodeKind>> {
        self.validate_node_slot(slot)?;
        Ok(self.read_slot(slot)?.kind())
    }

    pub fn is_leaf(&self, slot: SlotId) -> Result<bool> {
        Ok(self.kind(slot)? == Some(NodeKind::Leaf))
    }

    pub fn is_empty(&self, slot: SlotId) -> Result<bool> {
        Ok(self.kind(slot)?.is_none())
    }

    /// Largest key stored in the node at `slot`.
    ///
    /// For an internal node this is also the largest key of its subtree.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the node has no entries.
    pub fn max_key(&self, slot: SlotId) -> Result<i64> {
        self.read_node(slot)?
            .last()
            .map(|entry| entry.key)
            .ok_or_else(|| Error::CorruptNode {
                slot: slot.0,
                reason: "referenced node has no entries".into(),
            })
    }

    /// Child slot an internal entry points at.
    pub fn child_of(&self, entry: &Entry) -> Result<SlotId> {
        SlotId::from_value(entry.value, self.num_records())
    }
}
