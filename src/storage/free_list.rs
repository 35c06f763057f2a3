//! Free-slot allocator.
//!
//! Unused slots form a singly-linked list. The head lives in the header
//! slot (slot 0), which is encoded like a free slot whose link is the head.
//! Each free slot links to the next one:
//! ```text
//! header ──▶ 4 ──▶ 7 ──▶ 8 ──▶ -1
//! ```
//! Released slots are pushed at the head, so the list behaves as a stack.

use crate::common::{Error, Result, SlotId};
use crate::storage::slot::Slot;
use crate::storage::NodeStore;

/// Allocator view over a [`NodeStore`].
///
/// Holds no state of its own: the head is read from and written to the
/// header slot on every call.
pub struct FreeList<'a> {
    store: &'a NodeStore,
}

impl<'a> FreeList<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    /// Format every slot as free, chained in ascending order.
    ///
    /// Produces `header -> 1 -> 2 -> ... -> num_records -> -1`.
    pub fn initialize(&self) -> Result<()> {
        let last = self.store.num_records();
        for i in 0..=last {
            let next = (i < last).then_some(SlotId::new(i + 1));
            self.store.write_slot(SlotId::new(i), &Slot::Free { next })?;
        }
        Ok(())
    }

    /// First free slot, or `None` if the list is empty.
    pub fn head(&self) -> Result<Option<SlotId>> {
        self.link_of(SlotId::HEADER)
    }

    fn set_head(&self, head: Option<SlotId>) -> Result<()> {
        self.store.write_slot(SlotId::HEADER, &Slot::Free { next: head })
    }

    /// The link stored in a free slot (or the head, for the header).
    fn link_of(&self, slot: SlotId) -> Result<Option<SlotId>> {
        match self.store.read_slot(slot)? {
            Slot::Free { next } => Ok(next),
            Slot::Occupied { .. } => Err(Error::CorruptFreeList(slot.0)),
        }
    }

    /// Pop the first free slot.
    ///
    /// The slot still reads as free afterwards; the caller overwrites it
    /// with the node it allocated the slot for.
    ///
    /// # Errors
    /// - `Error::SlotsExhausted` if the list is empty
    /// - `Error::CorruptFreeList` if the head is not a free slot
    pub fn allocate(&self) -> Result<SlotId> {
        let slot = self.head()?.ok_or(Error::SlotsExhausted {
            needed: 1,
            available: 0,
        })?;
        let next = self.link_of(slot)?;
        self.set_head(next)?;
        Ok(slot)
    }

    /// Mark a node slot free and push it on the list.
    pub fn release(&self, slot: SlotId) -> Result<()> {
        if slot == SlotId::HEADER {
            return Err(Error::InvalidSlot {
                slot: 0,
                min: 1,
                max: self.store.num_records(),
            });
        }
        let head = self.head()?;
        self.store.write_slot(slot, &Slot::Free { next: head })?;
        self.set_head(Some(slot))
    }

    /// Take a specific slot off the list.
    ///
    /// Used to reclaim the root slot when an empty tree gets its first entry.
    ///
    /// # Errors
    /// Returns `Error::CorruptFreeList` if the slot is not on the list.
    pub fn claim(&self, slot: SlotId) -> Result<()> {
        let mut prev = SlotId::HEADER;
        for _ in 0..self.store.num_records() {
            match self.link_of(prev)? {
                Some(current) if current == slot => {
                    let next = self.link_of(current)?;
                    return self.store.write_slot(prev, &Slot::Free { next });
                }
                Some(current) => prev = current,
                None => break,
            }
        }
        Err(Error::CorruptFreeList(slot.0))
    }

    /// Every slot on the list, head first.
    ///
    /// # Errors
    /// Returns `Error::CorruptFreeList` if the chain is longer than the
    /// number of slots (a cycle) or passes through an occupied slot.
    pub fn slots(&self) -> Result<Vec<SlotId>> {
        let mut slots = Vec::new();
        let mut current = self.head()?;
        while let Some(slot) = current {
            if slots.len() == self.store.num_records() as usize {
                return Err(Error::CorruptFreeList(slot.0));
            }
            slots.push(slot);
            current = self.link_of(slot)?;
        }
        Ok(slots)
    }

    /// Number of slots on the list.
    pub fn count(&self) -> Result<usize> {
        Ok(self.slots()?.len())
    }

    /// Whether at least `n` slots are free, walking no further than needed.
    pub fn has_at_least(&self, n: usize) -> Result<bool> {
        let mut seen = 0;
        let mut current = self.head()?;
        while seen < n {
            match current {
                Some(slot) => {
                    seen += 1;
                    current = self.link_of(slot)?;
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}
