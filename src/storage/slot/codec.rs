//! Cell codec - fixed-width decimal text cells.
//!
//! Every integer in the slot file is stored as left-justified decimal text,
//! padded with spaces to exactly `cell_size` characters:
//! ```text
//! cell_size = 5
//! ┌─────┬─────┬─────┐
//! │14   │-1   │12345│
//! └─────┴─────┴─────┘
//! ```

use crate::common::{Error, Result};

/// Converts integers to and from fixed-width cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCodec {
    cell_size: usize,
}

impl CellCodec {
    pub fn new(cell_size: usize) -> Self {
        Self { cell_size }
    }

    /// Width of one cell in bytes.
    #[inline]
    pub fn cell_size(&self) -> usize {
        self.cell_size
    }

    /// Encode a value as `cell_size` characters.
    ///
    /// # Errors
    /// Returns `Error::ValueOverflow` if the decimal text is wider than a cell.
    pub fn encode(&self, value: i64) -> Result<String> {
        let text = value.to_string();
        if text.len() > self.cell_size {
            return Err(Error::ValueOverflow {
                value,
                cell_size: self.cell_size,
            });
        }
        Ok(format!("{:<width$}", text, width = self.cell_size))
    }

    /// Append the encoded value to `out`.
    pub fn encode_into(&self, value: i64, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.encode(value)?.as_bytes());
        Ok(())
    }

    /// Check that a value is representable without encoding it.
    pub fn check(&self, value: i64) -> Result<()> {
        self.encode(value).map(|_| ())
    }

    /// Decode one cell. Returns `None` if the text is not a decimal integer.
    pub fn decode(&self, cell: &[u8]) -> Option<i64> {
        let text = std::str::from_utf8(cell).ok()?;
        text.trim_end_matches(' ').parse().ok()
    }
}
