//! Slot identifier type.

use std::fmt;

use super::error::{Error, Result};

/// Identifies a slot in the slot file.
///
/// Slot 0 is the header holding the free-list head. Slot 1 is always the
/// root. Slots `2..=num_records` are allocated to nodes as the tree grows.
///
/// # Example
/// ```
/// use slotindex::SlotId;
///
/// let slot = SlotId::new(3);
/// assert_eq!(slot.0, 3);
/// assert!(SlotId::ROOT.is_root());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The header slot holding the free-list head.
    pub const HEADER: SlotId = SlotId(0);

    /// The root node's permanent slot.
    pub const ROOT: SlotId = SlotId(1);

    /// Create a new SlotId.
    #[inline]
    pub fn new(id: u32) -> Self {
        SlotId(id)
    }

    /// Check if this is the root slot.
    #[inline]
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// The slot index as stored in a cell.
    #[inline]
    pub fn as_value(&self) -> i64 {
        i64::from(self.0)
    }

    /// Interpret a cell value as a node slot in `1..=max`.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the value is out of range.
    pub fn from_value(value: i64, max: u32) -> Result<Self> {
        if value < 1 || value > i64::from(max) {
            return Err(Error::InvalidSlot {
                slot: value,
                min: 1,
                max,
            });
        }
        // In range, so the narrowing cannot truncate.
        Ok(SlotId(value as u32))
    }

    /// The free-list link encoding: `-1` means end of list.
    pub fn link_value(link: Option<SlotId>) -> i64 {
        link.map_or(-1, |slot| slot.as_value())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}
