use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::binlog::{EventHeader, RowChangeRecord, RowImage, RowOperation, SchemaDefinition};

/// One row change, shaped after the common CDC envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub database: String,
    pub table: String,
    pub op: RowOperation,
    /// Processing time.
    pub ts_ms: i64,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub source: SourceMetadata,
}

/// A table map, emitted when schema events are requested.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaChangeEvent {
    pub database: String,
    pub table: String,
    pub ts_ms: i64,
    pub schema: SchemaDefinition,
    pub source: SourceMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceMetadata {
    pub version: String,
    pub connector: String,
    /// Time the event was logged by the server.
    pub ts_ms: i64,
    pub file: String,
    pub position: u64,
    pub server_id: u32,
    pub table_id: u64,
}

impl SourceMetadata {
    pub fn new(file: String, header: &EventHeader, position: u64, table_id: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            connector: "binlog-capture".to_string(),
            ts_ms: header.timestamp as i64 * 1000,
            file,
            position,
            server_id: header.server_id,
            table_id,
        }
    }
}

impl ChangeEvent {
    /// Expands a rows event into one change event per logical row.
    ///
    /// Update events carry before and after images in pairs; a trailing
    /// unpaired image is reported as an update with no after image.
    pub fn from_rows(
        record: &RowChangeRecord,
        schema: &SchemaDefinition,
        source: SourceMetadata,
    ) -> Vec<ChangeEvent> {
        let event = |before: Option<&RowImage>, after: Option<&RowImage>| ChangeEvent {
            database: schema.database_name.clone(),
            table: schema.table_name.clone(),
            op: record.operation,
            ts_ms: Utc::now().timestamp_millis(),
            before: before.map(row_to_json),
            after: after.map(row_to_json),
            source: source.clone(),
        };

        match record.operation {
            RowOperation::Insert => record.rows.iter().map(|row| event(None, Some(row))).collect(),
            RowOperation::Delete => record.rows.iter().map(|row| event(Some(row), None)).collect(),
            RowOperation::Update => record
                .rows
                .chunks(2)
                .map(|pair| event(pair.first(), pair.get(1)))
                .collect(),
        }
    }
}

impl SchemaChangeEvent {
    pub fn new(schema: SchemaDefinition, source: SourceMetadata) -> Self {
        Self {
            database: schema.database_name.clone(),
            table: schema.table_name.clone(),
            ts_ms: Utc::now().timestamp_millis(),
            schema,
            source,
        }
    }
}

/// Renders a row image as an object keyed `col_<index>`. Columns absent
/// from the image are left out.
pub fn row_to_json(row: &RowImage) -> Value {
    let mut object = Map::new();
    for (index, cell) in row.iter().enumerate() {
        if let Some(cell) = cell {
            object.insert(format!("col_{}", index), cell.to_json());
        }
    }
    Value::Object(object)
}
