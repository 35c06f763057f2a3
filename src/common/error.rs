//! Error types for slotindex.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in slotindex.
///
/// Range and corruption errors indicate a bug or a damaged file and are
/// not meant to be retried. `SlotsExhausted` is the only condition a caller
/// is expected to handle: the tree is full and the insert was refused.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A slot index outside the slot file was requested.
    #[error("Invalid slot {slot}: valid range is {min}..={max}")]
    InvalidSlot { slot: i64, min: u32, max: u32 },

    /// An entry index outside `1..=fanout` was requested.
    #[error("Invalid entry {entry}: valid range is 1..={fanout}")]
    InvalidEntry { entry: usize, fanout: usize },

    /// A split needs more free slots than the free list holds.
    ///
    /// The insert that triggered it was refused before touching the file.
    #[error("Slots exhausted: need {needed}, only {available} free")]
    SlotsExhausted { needed: usize, available: usize },

    /// An integer does not fit in a cell.
    #[error("Value {value} does not fit in a {cell_size}-character cell")]
    ValueOverflow { value: i64, cell_size: usize },

    /// A cell holds text that is not a decimal integer.
    #[error("Corrupt cell {cell} in slot {slot}: {text:?}")]
    CorruptCell { slot: u32, cell: usize, text: String },

    /// The free list points at an occupied slot or loops.
    #[error("Corrupt free list at slot {0}")]
    CorruptFreeList(u32),

    /// A node is structurally damaged (unknown status, empty internal node...).
    #[error("Corrupt node in slot {slot}: {reason}")]
    CorruptNode { slot: u32, reason: String },

    /// The `(-1, -1)` pair marks unused entries and cannot be stored.
    #[error("Entry ({key}, {value}) is reserved as the unused-entry marker")]
    ReservedEntry { key: i64, value: i64 },

    /// Tree geometry rejected at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The verifier found a broken tree invariant.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SlotsExhausted {
            needed: 2,
            available: 1,
        };
        assert_eq!(format!("{}", err), "Slots exhausted: need 2, only 1 free");

        let err = Error::InvalidSlot {
            slot: 11,
            min: 1,
            max: 10,
        };
        assert_eq!(format!("{}", err), "Invalid slot 11: valid range is 1..=10");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::CorruptFreeList(3).source().is_none());
    }
}
