use serde::{Deserialize, Serialize};

use super::bitset::Bitset;
use super::cell::Cell;
use super::constants::{EventType, ROWS_FLAG_STMT_END};
use super::header::EventHeader;
use super::schema::SchemaDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowOperation {
    Insert,
    Update,
    Delete,
}

/// Wire revision of a rows event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowsEventVersion {
    /// Pre-GA 5.1 rows events.
    V0,
    V1,
    /// Adds a variable-length extra-info block after the flags.
    V2,
}

impl RowsEventVersion {
    pub fn has_extra_info(&self) -> bool {
        matches!(self, RowsEventVersion::V2)
    }
}

/// Operation and wire revision of a rows event type, or `None` for any
/// other event type.
pub fn rows_event_kind(event_type: EventType) -> Option<(RowOperation, RowsEventVersion)> {
    use EventType::*;
    use RowOperation::*;
    use RowsEventVersion::*;

    match event_type {
        PRE_GA_WRITE_ROWS_EVENT => Some((Insert, V0)),
        PRE_GA_UPDATE_ROWS_EVENT => Some((Update, V0)),
        PRE_GA_DELETE_ROWS_EVENT => Some((Delete, V0)),
        WRITE_ROWS_EVENT_V1 => Some((Insert, V1)),
        UPDATE_ROWS_EVENT_V1 => Some((Update, V1)),
        DELETE_ROWS_EVENT_V1 => Some((Delete, V1)),
        WRITE_ROWS_EVENT => Some((Insert, V2)),
        UPDATE_ROWS_EVENT => Some((Update, V2)),
        DELETE_ROWS_EVENT => Some((Delete, V2)),
        _ => None,
    }
}

/// One row image indexed by column; `None` marks a column absent from the
/// image, as opposed to a present SQL NULL.
pub type RowImage = Vec<Option<Cell>>;

#[derive(Debug, Clone, PartialEq)]
pub struct RowChangeRecord {
    pub operation: RowOperation,
    pub version: RowsEventVersion,
    pub table_id: u64,
    pub flags: u16,
    pub column_count: u64,
    pub used_columns: Bitset,
    /// Columns present in the after images of an update.
    pub used_columns_after: Option<Bitset>,
    /// For updates, before and after images alternate.
    pub rows: Vec<RowImage>,
}

impl RowChangeRecord {
    pub fn is_statement_end(&self) -> bool {
        self.flags & ROWS_FLAG_STMT_END != 0
    }

    /// Number of logical rows; an update pairs two images per row.
    pub fn row_count(&self) -> usize {
        match self.operation {
            RowOperation::Update => self.rows.len() / 2,
            _ => self.rows.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    SchemaDefinition(SchemaDefinition),
    RowChange(RowChangeRecord),
    /// Event types this decoder does not interpret.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub header: EventHeader,
    /// Stream offset of the first header byte.
    pub position: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn is_skipped(&self) -> bool {
        matches!(self.payload, EventPayload::Skipped)
    }
}
