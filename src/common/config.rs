//! Tree geometry and slot format constants.

use super::error::{Error, Result};

/// Status cell value of a slot on the free list.
pub const STATUS_FREE: i64 = -1;

/// Status cell value of a leaf node.
pub const STATUS_LEAF: i64 = 0;

/// Status cell value of an internal node.
pub const STATUS_INTERNAL: i64 = 1;

/// Filler for unused cells and the end-of-list link.
pub const NIL: i64 = -1;

/// Geometry of a tree file.
///
/// # File Layout
/// The file holds `num_records + 1` slots of `cell_size * (1 + 2 * fanout)`
/// characters each:
/// ```text
/// ┌────────┬──────────┬──────────┬─────┬──────────┬──────────┐
/// │ status │ key 1    │ value 1  │ ... │ key m    │ value m  │
/// │ cell 0 │ cell 1   │ cell 2   │     │ cell 2m-1│ cell 2m  │
/// └────────┴──────────┴──────────┴─────┴──────────┴──────────┘
/// ```
///
/// # Example
/// ```
/// use slotindex::TreeConfig;
///
/// let config = TreeConfig::default().with_fanout(4);
/// assert_eq!(config.slot_size(), 5 * 9);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Number of node slots (slot 0, the header, comes on top).
    pub num_records: u32,
    /// Maximum number of entries per node.
    pub fanout: usize,
    /// Characters per integer cell.
    pub cell_size: usize,
}

impl TreeConfig {
    pub fn new(num_records: u32, fanout: usize, cell_size: usize) -> Self {
        Self {
            num_records,
            fanout,
            cell_size,
        }
    }

    pub fn with_num_records(mut self, num_records: u32) -> Self {
        self.num_records = num_records;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn with_cell_size(mut self, cell_size: usize) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Cells per slot: the status cell plus a key and value per entry.
    #[inline]
    pub fn cells_per_slot(&self) -> usize {
        1 + 2 * self.fanout
    }

    /// Size of one slot in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.cell_size * self.cells_per_slot()
    }

    /// Total number of slots including the header.
    #[inline]
    pub fn slot_count(&self) -> u32 {
        self.num_records + 1
    }

    /// Size of the whole file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        u64::from(self.slot_count()) * self.slot_size() as u64
    }

    /// Entry count below which a non-root node is rebalanced.
    #[inline]
    pub fn min_entries(&self) -> usize {
        self.fanout / 2
    }

    /// Reject geometries the slot format cannot represent.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` for a zero capacity, a fanout below 2,
    ///   or a cell too narrow to hold `-1`
    /// - `Error::ValueOverflow` if a slot index does not fit in a cell
    pub fn validate(&self) -> Result<()> {
        if self.num_records == 0 {
            return Err(Error::InvalidConfig("num_records must be > 0".into()));
        }
        if self.fanout < 2 {
            return Err(Error::InvalidConfig(format!(
                "fanout must be >= 2, got {}",
                self.fanout
            )));
        }
        if self.cell_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "cell_size must be >= 2, got {}",
                self.cell_size
            )));
        }
        let widest_slot = self.num_records.to_string().len();
        if widest_slot > self.cell_size {
            return Err(Error::ValueOverflow {
                value: i64::from(self.num_records),
                cell_size: self.cell_size,
            });
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(10, 5, 5)
    }
}
