//! Slot File - low-level file I/O for fixed-size slots.
//!
//! The [`SlotFile`] handles all direct file operations:
//! - Reading and writing whole slots
//! - Writing the entry region or status cell of a slot
//! - Creating (and truncating) the backing file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::{Error, Result, SlotId, TreeConfig};
use crate::storage::slot::SlotFormat;

/// Manages I/O for a single slot file.
///
/// # File Layout
/// Slots are laid out sequentially, each `slot_size` bytes:
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬──────────┐
/// │ Slot 0   │ Slot 1   │ Slot 2   │  ...    │ Slot N   │
/// │ (header) │ (root)   │          │         │          │
/// └──────────┴──────────┴──────────┴─────────┴──────────┘
/// Offset:  0     S         2×S       ...       N×S
/// ```
///
/// # Thread Safety
/// The file handle sits behind a `Mutex` so reads work through `&self`.
/// Each call seeks and transfers under the lock; callers serialize
/// multi-slot mutations themselves.
pub struct SlotFile {
    file: Mutex<File>,
    format: SlotFormat,
}

impl SlotFile {
    /// Create a slot file of `config.file_size()` bytes.
    ///
    /// An existing file is truncated. The contents are zero bytes until
    /// the caller formats them.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or resized.
    pub fn create<P: AsRef<Path>>(path: P, config: &TreeConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(config.file_size())?;

        Ok(Self {
            file: Mutex::new(file),
            format: SlotFormat::new(config),
        })
    }

    #[inline]
    pub fn format(&self) -> &SlotFormat {
        &self.format
    }

    /// Number of slots including the header.
    #[inline]
    pub fn slot_count(&self) -> u32 {
        self.format.num_records() + 1
    }

    fn offset(&self, slot: SlotId) -> Result<u64> {
        if slot.0 > self.format.num_records() {
            return Err(Error::InvalidSlot {
                slot: slot.as_value(),
                min: 0,
                max: self.format.num_records(),
            });
        }
        Ok(u64::from(slot.0) * self.format.slot_size() as u64)
    }

    /// Read the raw bytes of a slot.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the slot is past the end of the file.
    pub fn read_slot(&self, slot: SlotId) -> Result<Vec<u8>> {
        let offset = self.offset(slot)?;
        let mut data = vec![0u8; self.format.slot_size()];

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut data)?;

        Ok(data)
    }

    /// Write `data` into a slot starting at cell `first_cell`.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the slot is past the end of the file.
    pub fn write_cells(&self, slot: SlotId, first_cell: usize, data: &[u8]) -> Result<()> {
        let cell_size = self.format.codec().cell_size();
        debug_assert!(first_cell * cell_size + data.len() <= self.format.slot_size());

        let offset = self.offset(slot)? + (first_cell * cell_size) as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        Ok(())
    }

    /// Overwrite a whole slot.
    pub fn write_slot(&self, slot: SlotId, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len(), self.format.slot_size());
        self.write_cells(slot, 0, data)
    }

    /// Read the entire file, header included.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.slot_count() as usize * self.format.slot_size()];

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut data)?;

        Ok(data)
    }

    /// Flush file contents to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    /// Get the size of the file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }
}
