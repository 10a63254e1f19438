//! Error types and result handling for binlog-capture.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use binlog_capture::{Error, Result};
//!
//! fn read_marker(marker: u8) -> Result<u64> {
//!     match marker {
//!         251 | 255 => Err(Error::InvalidPackedIntegerMarker { marker }),
//!         v => Ok(v as u64),
//!     }
//! }
//!
//! match read_marker(251) {
//!     Ok(v) => println!("value {}", v),
//!     Err(Error::InvalidPackedIntegerMarker { marker }) => eprintln!("bad marker {}", marker),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for binlog-capture operations.
///
/// Decoding errors are returned to the caller of the failing operation and
/// never silently defaulted. Whether an error ends the whole run or only the
/// current event is decided by the outermost driver.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, typically from an invalid file or environment variable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying byte source or checkpoint file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error when encoding output records.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The first four bytes of the source are not the binlog magic number.
    #[error("Not a binlog file: magic number was {found:02x?}")]
    MalformedMagic {
        /// The bytes found where the magic number was expected
        found: [u8; 4],
    },

    /// The detected log version cannot be decoded.
    #[error("Unsupported binlog version {version}, only version 4 is supported")]
    UnsupportedLogVersion {
        /// The detected version
        version: u8,
    },

    /// Fewer bytes were available than a field requires.
    #[error("Truncated read: needed {needed} bytes but only {available} available")]
    TruncatedRead {
        /// Bytes the field requires
        needed: usize,
        /// Bytes that were actually available
        available: usize,
    },

    /// A packed integer started with a reserved marker byte (251 or 255).
    #[error("Invalid packed integer marker: {marker}")]
    InvalidPackedIntegerMarker {
        /// The offending marker byte
        marker: u8,
    },

    /// A row-change event referenced a table with no cached table map.
    #[error("No table map received for table id {table_id}")]
    MissingSchemaForTable {
        /// The referenced table id
        table_id: u64,
    },

    /// A cell of a column type outside the supported set was requested.
    #[error("Unsupported column type: {column_type}")]
    UnsupportedColumnType {
        /// Raw column type code
        column_type: u8,
    },

    /// Per-column metadata ran past the metadata block declared by the table map.
    #[error("Column metadata exceeded its declared length: read {consumed} of {declared} bytes")]
    MetadataLengthExceeded {
        /// Bytes consumed so far
        consumed: u64,
        /// Bytes declared by the event
        declared: u64,
    },

    /// An event header declared a length too small to hold its own header.
    #[error("Invalid event length {length} at position {position}")]
    InvalidEventLength {
        /// Declared event length
        length: u32,
        /// Stream offset of the event
        position: u64,
    },

    /// The stored CRC32 of an event does not match its contents.
    #[error("Checksum mismatch at {position}: stored {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Stream offset of the event
        position: u64,
        /// Checksum stored in the event
        expected: u32,
        /// Checksum computed over the event bytes
        computed: u32,
    },

    /// A bit range with `end <= start` was requested.
    #[error("Invalid bit range {start}..{end}")]
    InvalidBitRange {
        /// Range start
        start: usize,
        /// Range end (exclusive)
        end: usize,
    },

    /// Bitwise operation between bitsets of different capacities.
    #[error("Bitset capacity mismatch: {left} vs {right}")]
    BitsetCapacityMismatch {
        /// Capacity of the left operand
        left: usize,
        /// Capacity of the right operand
        right: usize,
    },

    /// Invalid or malformed event body.
    #[error("Invalid message format: {message}")]
    InvalidMessage {
        /// Description of what was invalid
        message: String,
    },
}

/// A convenient Result type alias for binlog-capture operations.
///
/// This is equivalent to `std::result::Result<T, binlog_capture::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
