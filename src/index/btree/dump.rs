//! Raw slot dump for external inspection.

use std::fmt;

use crate::common::SlotId;

/// The raw text of every slot, in slot order, header first.
///
/// # Example
/// ```no_run
/// use slotindex::{BTree, TreeConfig};
///
/// let tree = BTree::create("index.db", TreeConfig::default()).unwrap();
/// let dump = tree.dump().unwrap();
/// println!("{}", dump); // one slot per line
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDump {
    slot_size: usize,
    data: Vec<u8>,
}

impl SlotDump {
    pub(crate) fn new(slot_size: usize, data: Vec<u8>) -> Self {
        debug_assert!(slot_size > 0 && data.len() % slot_size == 0);
        Self { slot_size, data }
    }

    /// Number of slots in the dump.
    pub fn len(&self) -> usize {
        self.data.len() / self.slot_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of each slot.
    pub fn slots(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks(self.slot_size)
    }

    /// Text of one slot, if it exists and is valid UTF-8.
    pub fn slot(&self, slot: SlotId) -> Option<&str> {
        let start = slot.0 as usize * self.slot_size;
        let bytes = self.data.get(start..start + self.slot_size)?;
        std::str::from_utf8(bytes).ok()
    }

    /// The whole file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// CRC32 of the whole file.
    ///
    /// Two dumps with equal checksums are, for test purposes, the same file.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.data)
    }
}

impl fmt::Display for SlotDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in self.slots() {
            writeln!(f, "{}", String::from_utf8_lossy(slot))?;
        }
        Ok(())
    }
}
