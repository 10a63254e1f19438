use bytes::{Buf, Bytes};
use tracing::{debug, trace};

use super::bitset::Bitset;
use super::cell::{decode_cell, Cell};
use super::codec::{read_bytes, read_packed_len, read_u16_le, read_u48_le, read_u8, skip};
use super::constants::EventType;
use super::header::EventHeader;
use super::metadata::ColumnMetadata;
use super::schema::{SchemaCache, SchemaDefinition};
use super::types::{
    rows_event_kind, EventPayload, RowChangeRecord, RowImage, RowOperation, RowsEventVersion,
};
use crate::{Error, Result};

/// Which body decoder handles an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    TableMap,
    Rows(RowOperation, RowsEventVersion),
    Skip,
}

/// Maps an event type code to its decoder. Unknown codes are skipped.
pub fn select_decoder(type_code: u8) -> DecoderKind {
    match EventType::try_from(type_code) {
        Ok(EventType::TABLE_MAP_EVENT) => DecoderKind::TableMap,
        Ok(event_type) => match rows_event_kind(event_type) {
            Some((operation, version)) => DecoderKind::Rows(operation, version),
            None => DecoderKind::Skip,
        },
        Err(_) => DecoderKind::Skip,
    }
}

/// Decodes event bodies, keeping the table maps seen so far.
///
/// One decoder serves one log stream; row events are resolved against the
/// table maps that preceded them in that stream.
pub struct EventDecoder {
    schemas: SchemaCache,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder {
    pub fn new() -> Self {
        Self {
            schemas: SchemaCache::new(),
        }
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Decodes `body` (checksum and extra header bytes already removed).
    pub fn decode(&mut self, header: &EventHeader, body: Bytes) -> Result<EventPayload> {
        match select_decoder(header.type_code) {
            DecoderKind::TableMap => {
                let definition = decode_table_map(body)?;
                self.schemas.insert_if_absent(definition.clone());
                Ok(EventPayload::SchemaDefinition(definition))
            }
            DecoderKind::Rows(operation, version) => {
                let record = decode_rows(operation, version, body, &self.schemas)?;
                trace!(
                    "{:?} rows event: table_id={}, images={}",
                    record.operation,
                    record.table_id,
                    record.rows.len()
                );
                Ok(EventPayload::RowChange(record))
            }
            DecoderKind::Skip => {
                debug!("Skipping event type {}", header.type_code);
                Ok(EventPayload::Skipped)
            }
        }
    }
}

/// Decodes a table map event body.
pub fn decode_table_map(mut body: Bytes) -> Result<SchemaDefinition> {
    let table_id = read_u48_le(&mut body)?;
    let _flags = read_u16_le(&mut body)?;

    let database_name = read_name(&mut body, "database")?;
    let table_name = read_name(&mut body, "table")?;

    let column_count = read_packed_len(&mut body)?;
    let column_types = read_bytes(&mut body, column_count)?.to_vec();

    let declared = read_packed_len(&mut body)?;
    let start = body.remaining();
    let mut column_metadata = Vec::with_capacity(column_count);

    for &column_type in &column_types {
        column_metadata.push(ColumnMetadata::decode(&mut body, column_type)?);

        let consumed = start - body.remaining();
        if consumed > declared {
            return Err(Error::MetadataLengthExceeded {
                consumed: consumed as u64,
                declared: declared as u64,
            });
        }
    }

    // Metadata for types this decoder does not know may leave bytes behind.
    let consumed = start - body.remaining();
    skip(&mut body, declared - consumed)?;

    let nullable = Bitset::read(&mut body, column_count)?;

    Ok(SchemaDefinition {
        table_id,
        database_name,
        table_name,
        column_types,
        column_metadata,
        nullable,
    })
}

/// Reads a length-prefixed, NUL-terminated name.
fn read_name(body: &mut Bytes, what: &str) -> Result<String> {
    let len = read_u8(body)? as usize;
    let raw = read_bytes(body, len)?;
    let terminator = read_u8(body)?;
    if terminator != 0 {
        return Err(Error::InvalidMessage {
            message: format!("Missing terminator after {} name", what),
        });
    }
    Ok(String::from_utf8_lossy(&raw).to_string())
}

/// Decodes a rows event body against the cached table map for its table.
pub fn decode_rows(
    operation: RowOperation,
    version: RowsEventVersion,
    mut body: Bytes,
    schemas: &SchemaCache,
) -> Result<RowChangeRecord> {
    let table_id = read_u48_le(&mut body)?;
    let flags = read_u16_le(&mut body)?;

    if version.has_extra_info() {
        // The length includes its own two bytes.
        let extra_len = read_u16_le(&mut body)? as usize;
        if extra_len < 2 {
            return Err(Error::InvalidMessage {
                message: format!("Invalid rows event extra info length: {}", extra_len),
            });
        }
        skip(&mut body, extra_len - 2)?;
    }

    let column_count = read_packed_len(&mut body)?;

    let schema = schemas
        .get(table_id)
        .ok_or(Error::MissingSchemaForTable { table_id })?;

    if column_count > schema.column_count() {
        return Err(Error::InvalidMessage {
            message: format!(
                "Rows event for {} has {} columns, table map declares {}",
                schema.qualified_name(),
                column_count,
                schema.column_count()
            ),
        });
    }

    let used_columns = Bitset::read(&mut body, column_count)?;
    let used_columns_after = match operation {
        RowOperation::Update => Some(Bitset::read(&mut body, column_count)?),
        _ => None,
    };

    let mut rows = Vec::new();
    while body.has_remaining() {
        let used = match &used_columns_after {
            Some(after) if rows.len() % 2 == 1 => after,
            _ => &used_columns,
        };

        let before = body.remaining();
        rows.push(decode_row(&mut body, schema, used)?);
        if body.remaining() == before {
            return Err(Error::InvalidMessage {
                message: format!("Empty row image in rows event for table id {}", table_id),
            });
        }
    }

    Ok(RowChangeRecord {
        operation,
        version,
        table_id,
        flags,
        column_count: column_count as u64,
        used_columns,
        used_columns_after,
        rows,
    })
}

/// Decodes one row image.
///
/// The null bit-vector has one bit per used column, in column order. It is
/// spread back to column positions so that only used, non-null columns are
/// read from the body.
fn decode_row<B: Buf>(buf: &mut B, schema: &SchemaDefinition, used: &Bitset) -> Result<RowImage> {
    let packed_nulls = Bitset::read(buf, used.count_ones())?;

    let mut nulls = Bitset::new(used.capacity());
    for (k, column) in used.iter_ones().enumerate() {
        if packed_nulls.bit(k) {
            nulls.set(column);
        }
    }
    let present = used.and_not(&nulls)?;

    let mut image: RowImage = vec![None; used.capacity()];
    for column in used.iter_ones() {
        let column_type = schema.column_types[column];
        let cell = if present.bit(column) {
            decode_cell(buf, column_type, schema.column_metadata[column].as_ref())?
        } else {
            Cell::Null { column_type }
        };
        image[column] = Some(cell);
    }

    Ok(image)
}
