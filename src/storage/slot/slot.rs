//! Slot - the decoded view of one fixed-size record of the slot file.
//!
//! On disk a slot is a row of cells. In memory it is a tagged [`Slot`]:
//! either a node with its entries, or a free-list link. The link of a free
//! slot lives in cell 1, the cell a node uses for its first key.

use crate::common::config::{NIL, STATUS_FREE, STATUS_INTERNAL, STATUS_LEAF};
use crate::common::{Error, Result, SlotId, TreeConfig};

use super::codec::CellCodec;

/// A (key, value) pair stored in a node.
///
/// In a leaf the value is the record reference. In an internal node the
/// key is the maximum key of the child subtree and the value is the child's
/// slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    pub key: i64,
    pub value: i64,
}

impl Entry {
    #[inline]
    pub fn new(key: i64, value: i64) -> Self {
        Self { key, value }
    }

    /// An internal entry pointing at `child`.
    #[inline]
    pub fn child(key: i64, child: SlotId) -> Self {
        Self::new(key, child.as_value())
    }

    /// The pair that marks an unused entry position.
    #[inline]
    pub fn is_unused_marker(&self) -> bool {
        self.key == NIL && self.value == NIL
    }
}

/// Whether a node holds records or child pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Internal,
}

impl NodeKind {
    /// The status cell value for this kind.
    pub fn status(self) -> i64 {
        match self {
            NodeKind::Leaf => STATUS_LEAF,
            NodeKind::Internal => STATUS_INTERNAL,
        }
    }
}

/// A decoded slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// On the free list; `next` is the following free slot.
    Free { next: Option<SlotId> },
    /// A tree node.
    Occupied { kind: NodeKind, entries: Vec<Entry> },
}

impl Slot {
    pub fn leaf(entries: Vec<Entry>) -> Self {
        Slot::Occupied {
            kind: NodeKind::Leaf,
            entries,
        }
    }

    pub fn internal(entries: Vec<Entry>) -> Self {
        Slot::Occupied {
            kind: NodeKind::Internal,
            entries,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free { .. })
    }

    /// Node kind, or `None` for a free slot.
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Slot::Free { .. } => None,
            Slot::Occupied { kind, .. } => Some(*kind),
        }
    }

    /// Node entries; a free slot has none.
    pub fn entries(&self) -> &[Entry] {
        match self {
            Slot::Free { .. } => &[],
            Slot::Occupied { entries, .. } => entries,
        }
    }

    pub fn into_entries(self) -> Vec<Entry> {
        match self {
            Slot::Free { .. } => Vec::new(),
            Slot::Occupied { entries, .. } => entries,
        }
    }
}

/// Encodes and decodes whole slots for one tree geometry.
#[derive(Debug, Clone, Copy)]
pub struct SlotFormat {
    codec: CellCodec,
    fanout: usize,
    num_records: u32,
}

impl SlotFormat {
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            codec: CellCodec::new(config.cell_size),
            fanout: config.fanout,
            num_records: config.num_records,
        }
    }

    #[inline]
    pub fn codec(&self) -> &CellCodec {
        &self.codec
    }

    #[inline]
    pub fn fanout(&self) -> usize {
        self.fanout
    }

    #[inline]
    pub fn num_records(&self) -> u32 {
        self.num_records
    }

    /// Size of one encoded slot in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.codec.cell_size() * (1 + 2 * self.fanout)
    }

    /// Encode the entry cells (1..=2·fanout), padding unused entries with `-1`.
    ///
    /// # Errors
    /// - `Error::InvalidEntry` if there are more entries than the fanout
    /// - `Error::ValueOverflow` if a key or value does not fit in a cell
    pub fn encode_entries(&self, entries: &[Entry]) -> Result<Vec<u8>> {
        if entries.len() > self.fanout {
            return Err(Error::InvalidEntry {
                entry: entries.len(),
                fanout: self.fanout,
            });
        }
        let mut out = Vec::with_capacity(self.slot_size() - self.codec.cell_size());
        for entry in entries {
            self.codec.encode_into(entry.key, &mut out)?;
            self.codec.encode_into(entry.value, &mut out)?;
        }
        for _ in entries.len()..self.fanout {
            self.codec.encode_into(NIL, &mut out)?;
            self.codec.encode_into(NIL, &mut out)?;
        }
        Ok(out)
    }

    /// Encode a full slot, status cell included.
    pub fn encode(&self, slot: &Slot) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.slot_size());
        match slot {
            Slot::Free { next } => {
                self.codec.encode_into(STATUS_FREE, &mut out)?;
                self.codec.encode_into(SlotId::link_value(*next), &mut out)?;
                for _ in 2..(1 + 2 * self.fanout) {
                    self.codec.encode_into(NIL, &mut out)?;
                }
            }
            Slot::Occupied { kind, entries } => {
                self.codec.encode_into(kind.status(), &mut out)?;
                out.extend_from_slice(&self.encode_entries(entries)?);
            }
        }
        Ok(out)
    }

    /// Decode one cell of the raw slot at `id`.
    fn cell(&self, id: SlotId, data: &[u8], cell: usize) -> Result<i64> {
        let width = self.codec.cell_size();
        let raw = &data[cell * width..(cell + 1) * width];
        self.codec.decode(raw).ok_or_else(|| Error::CorruptCell {
            slot: id.0,
            cell,
            text: String::from_utf8_lossy(raw).into_owned(),
        })
    }

    /// Decode a full slot.
    ///
    /// Entries are read pairwise until the `(-1, -1)` marker or the fanout.
    ///
    /// # Errors
    /// - `Error::CorruptCell` if a cell does not parse
    /// - `Error::CorruptNode` for an unknown status or a short buffer
    /// - `Error::CorruptFreeList` if a free link points outside the file
    pub fn decode(&self, id: SlotId, data: &[u8]) -> Result<Slot> {
        if data.len() < self.slot_size() {
            return Err(Error::CorruptNode {
                slot: id.0,
                reason: format!("short slot: {} of {} bytes", data.len(), self.slot_size()),
            });
        }

        let kind = match self.cell(id, data, 0)? {
            STATUS_FREE => {
                let next = match self.cell(id, data, 1)? {
                    NIL => None,
                    link => Some(
                        SlotId::from_value(link, self.num_records)
                            .map_err(|_| Error::CorruptFreeList(id.0))?,
                    ),
                };
                return Ok(Slot::Free { next });
            }
            STATUS_LEAF => NodeKind::Leaf,
            STATUS_INTERNAL => NodeKind::Internal,
            other => {
                return Err(Error::CorruptNode {
                    slot: id.0,
                    reason: format!("unknown status {}", other),
                })
            }
        };

        let mut entries = Vec::new();
        for i in 1..=self.fanout {
            let entry = Entry::new(
                self.cell(id, data, 2 * i - 1)?,
                self.cell(id, data, 2 * i)?,
            );
            if entry.is_unused_marker() {
                break;
            }
            entries.push(entry);
        }
        Ok(Slot::Occupied { kind, entries })
    }
}
