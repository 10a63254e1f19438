//! Per-column-type decoding of row image cells.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Buf;
use serde_json::Value;

use super::codec::{read_bytes, read_u16_le, read_u8, read_uint_le};
use super::constants::ColumnType;
use super::metadata::ColumnMetadata;
use super::temporal::{decode_datetime2, decode_time2, decode_timestamp2, DateTimeValue, TimeValue};
use crate::{Error, Result};

/// One decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A used column whose null bit is set, tagged with its declared type.
    Null { column_type: u8 },
    Integer(u64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
    Duration(TimeValue),
    Timestamp(DateTimeValue),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null { .. })
    }

    /// JSON rendering used by change events.
    ///
    /// Binary values are written as `base64:`-prefixed strings and temporal
    /// values in their SQL text form.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null { .. } => Value::Null,
            Cell::Integer(v) => Value::from(*v),
            Cell::Float(v) => Value::from(*v as f64),
            Cell::Double(v) => Value::from(*v),
            Cell::Bytes(bytes) => Value::String(format!("base64:{}", STANDARD.encode(bytes))),
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Duration(time) => Value::String(time.to_string()),
            Cell::Timestamp(datetime) => Value::String(datetime.to_string()),
        }
    }
}

/// Decodes one non-null cell of `column_type` using its table map metadata.
pub fn decode_cell<B: Buf>(
    buf: &mut B,
    column_type: u8,
    metadata: Option<&ColumnMetadata>,
) -> Result<Cell> {
    use ColumnType::*;

    let declared = ColumnType::try_from(column_type)
        .map_err(|code| Error::UnsupportedColumnType { column_type: code })?;

    let cell = match declared {
        MYSQL_TYPE_TINY => Cell::Integer(read_uint_le(buf, 1)?),
        MYSQL_TYPE_SHORT => Cell::Integer(read_uint_le(buf, 2)?),
        MYSQL_TYPE_INT24 => Cell::Integer(read_uint_le(buf, 3)?),
        MYSQL_TYPE_LONG => Cell::Integer(read_uint_le(buf, 4)?),
        MYSQL_TYPE_LONGLONG => Cell::Integer(read_uint_le(buf, 8)?),
        MYSQL_TYPE_FLOAT => Cell::Float(f32::from_bits(read_uint_le(buf, 4)? as u32)),
        MYSQL_TYPE_DOUBLE => Cell::Double(f64::from_bits(read_uint_le(buf, 8)?)),
        MYSQL_TYPE_YEAR => Cell::Integer(1900 + read_u8(buf)? as u64),
        MYSQL_TYPE_NULL => Cell::Null { column_type },

        MYSQL_TYPE_VARCHAR => {
            let max_length = require(metadata, column_type)?.max_length();
            let len = read_length_prefix(buf, max_length)?;
            text_or_bytes(read_bytes(buf, len)?.to_vec())
        }
        MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING => {
            decode_string(buf, column_type, require(metadata, column_type)?)?
        }
        MYSQL_TYPE_BLOB | MYSQL_TYPE_JSON => {
            let pack_size = require(metadata, column_type)?.pack_size();
            if !(1..=4).contains(&pack_size) {
                return Err(Error::InvalidMessage {
                    message: format!("Invalid blob pack size: {}", pack_size),
                });
            }
            let len = read_uint_le(buf, pack_size as usize)? as usize;
            Cell::Bytes(read_bytes(buf, len)?.to_vec())
        }

        MYSQL_TYPE_TIME2 => {
            let precision = require(metadata, column_type)?.fractional_seconds_precision();
            Cell::Duration(decode_time2(buf, precision)?)
        }
        MYSQL_TYPE_DATETIME2 => {
            let precision = require(metadata, column_type)?.fractional_seconds_precision();
            Cell::Timestamp(decode_datetime2(buf, precision)?)
        }
        MYSQL_TYPE_TIMESTAMP2 => {
            let precision = require(metadata, column_type)?.fractional_seconds_precision();
            Cell::Timestamp(decode_timestamp2(buf, precision)?)
        }

        MYSQL_TYPE_BIT
        | MYSQL_TYPE_NEWDECIMAL
        | MYSQL_TYPE_DECIMAL
        | MYSQL_TYPE_TIMESTAMP
        | MYSQL_TYPE_DATE
        | MYSQL_TYPE_TIME
        | MYSQL_TYPE_DATETIME
        | MYSQL_TYPE_GEOMETRY
        | MYSQL_TYPE_ENUM
        | MYSQL_TYPE_SET
        | MYSQL_TYPE_NEWDATE
        | MYSQL_TYPE_TINY_BLOB
        | MYSQL_TYPE_MEDIUM_BLOB
        | MYSQL_TYPE_LONG_BLOB => return Err(Error::UnsupportedColumnType { column_type }),
    };

    Ok(cell)
}

/// CHAR/BINARY columns, and ENUM/SET columns logged under the string type.
fn decode_string<B: Buf>(buf: &mut B, column_type: u8, metadata: &ColumnMetadata) -> Result<Cell> {
    let (real_type, max_length) = metadata.string_type_and_length();

    match ColumnType::try_from(real_type) {
        Ok(ColumnType::MYSQL_TYPE_ENUM) => {
            let width = metadata.pack_size();
            if !(1..=2).contains(&width) {
                return Err(Error::InvalidMessage {
                    message: format!("Invalid enum pack size: {}", width),
                });
            }
            Ok(Cell::Integer(read_uint_le(buf, width as usize)?))
        }
        Ok(ColumnType::MYSQL_TYPE_SET) => {
            let width = metadata.pack_size();
            if !(1..=8).contains(&width) {
                return Err(Error::InvalidMessage {
                    message: format!("Invalid set pack size: {}", width),
                });
            }
            Ok(Cell::Integer(read_uint_le(buf, width as usize)?))
        }
        Ok(ColumnType::MYSQL_TYPE_STRING) | Ok(ColumnType::MYSQL_TYPE_VAR_STRING) => {
            let len = read_length_prefix(buf, max_length)?;
            Ok(text_or_bytes(read_bytes(buf, len)?.to_vec()))
        }
        _ => Err(Error::UnsupportedColumnType { column_type }),
    }
}

/// Reads a 1-byte length for columns shorter than 256 bytes, 2 bytes otherwise.
fn read_length_prefix<B: Buf>(buf: &mut B, max_length: u16) -> Result<usize> {
    if max_length < 256 {
        Ok(read_u8(buf)? as usize)
    } else {
        Ok(read_u16_le(buf)? as usize)
    }
}

fn text_or_bytes(raw: Vec<u8>) -> Cell {
    match String::from_utf8(raw) {
        Ok(text) => Cell::Text(text),
        Err(e) => Cell::Bytes(e.into_bytes()),
    }
}

fn require(metadata: Option<&ColumnMetadata>, column_type: u8) -> Result<&ColumnMetadata> {
    metadata.ok_or_else(|| Error::InvalidMessage {
        message: format!("Missing metadata for column type {}", column_type),
    })
}
