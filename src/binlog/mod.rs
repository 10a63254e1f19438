//! MySQL binary log decoding.
//!
//! [`LogStream`] reads a binlog file event by event. Table map events are
//! cached per stream so that the rows events following them can be decoded
//! into typed cells.

pub mod bitset;
pub mod cell;
pub mod codec;
pub mod constants;
pub mod decoder;
pub mod format;
pub mod header;
pub mod metadata;
pub mod schema;
pub mod stream;
pub mod temporal;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;


pub use bitset::Bitset;
pub use cell::Cell;
pub use constants::{ColumnType, EventType};
pub use decoder::{select_decoder, DecoderKind, EventDecoder};
pub use format::{ChecksumAlgorithm, FormatDescription};
pub use header::{determine_log_version, EventHeader};
pub use metadata::ColumnMetadata;
pub use schema::{SchemaCache, SchemaDefinition};
pub use stream::{LogStream, StreamOptions};
pub use temporal::{DateTimeValue, TimeValue};
pub use types::{Event, EventPayload, RowChangeRecord, RowImage, RowOperation, RowsEventVersion};
