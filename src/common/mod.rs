//! Common types and utilities shared across slotindex.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Tree geometry and slot format constants
//! - Error types
//! - Slot identifiers

pub mod config;
pub mod error;
mod slot_id;

pub use config::TreeConfig;
pub use error::{Error, Result};
pub use slot_id::SlotId;
