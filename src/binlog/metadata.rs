//! Per-column metadata stored in table map events.
//!
//! The layout of each column's metadata depends only on the declared column
//! type:
//!
//! | column type | bytes | variant |
//! |---|---|---|
//! | float, double, blob, geometry, json | 1 | `PackSize` |
//! | timestamp2, datetime2, time2 | 1 | `TemporalV2` |
//! | varchar | 2 | `Varchar` |
//! | bit | 2 | `BitsetLen` |
//! | newdecimal | 2 | `Decimal` |
//! | var_string, string | 2 | `StringLike` |
//! | anything else | 0 | none |

use bytes::Buf;
use serde::Serialize;

use super::codec::{read_u16_le, read_u8};
use super::constants::ColumnType;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMetadata {
    PackSize(u8),
    Varchar { max_length: u16 },
    StringLike { real_type: u8, pack_size: u8 },
    BitsetLen { bits: u8, pack_size: u8 },
    Decimal { precision: u8, scale: u8 },
    TemporalV2 { fractional_seconds_precision: u8 },
}

impl ColumnMetadata {
    /// Decodes the metadata for one column of type `column_type`.
    pub fn decode<B: Buf>(buf: &mut B, column_type: u8) -> Result<Option<ColumnMetadata>> {
        use ColumnType::*;

        let column_type = match ColumnType::try_from(column_type) {
            Ok(t) => t,
            Err(_) => return Ok(None),
        };

        let metadata = match column_type {
            MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE | MYSQL_TYPE_BLOB | MYSQL_TYPE_GEOMETRY
            | MYSQL_TYPE_JSON => ColumnMetadata::PackSize(read_u8(buf)?),
            MYSQL_TYPE_TIMESTAMP2 | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIME2 => {
                ColumnMetadata::TemporalV2 {
                    fractional_seconds_precision: read_u8(buf)?,
                }
            }
            MYSQL_TYPE_VARCHAR => ColumnMetadata::Varchar {
                max_length: read_u16_le(buf)?,
            },
            MYSQL_TYPE_BIT => {
                let bits = read_u8(buf)?;
                let pack_size = read_u8(buf)?;
                ColumnMetadata::BitsetLen { bits, pack_size }
            }
            MYSQL_TYPE_NEWDECIMAL => {
                let precision = read_u8(buf)?;
                let scale = read_u8(buf)?;
                ColumnMetadata::Decimal { precision, scale }
            }
            MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING => {
                let real_type = read_u8(buf)?;
                let pack_size = read_u8(buf)?;
                ColumnMetadata::StringLike {
                    real_type,
                    pack_size,
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(metadata))
    }

    /// Number of metadata bytes this variant occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            ColumnMetadata::PackSize(_) | ColumnMetadata::TemporalV2 { .. } => 1,
            _ => 2,
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `PackSize`, `StringLike` or `BitsetLen` metadata.
    pub fn pack_size(&self) -> u8 {
        match *self {
            ColumnMetadata::PackSize(size) => size,
            ColumnMetadata::StringLike { pack_size, .. } => pack_size,
            ColumnMetadata::BitsetLen { pack_size, .. } => pack_size,
            other => panic!("pack_size() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `Varchar` metadata.
    pub fn max_length(&self) -> u16 {
        match *self {
            ColumnMetadata::Varchar { max_length } => max_length,
            other => panic!("max_length() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `StringLike` metadata.
    pub fn real_type(&self) -> u8 {
        match *self {
            ColumnMetadata::StringLike { real_type, .. } => real_type,
            other => panic!("real_type() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `BitsetLen` metadata.
    pub fn bits(&self) -> u8 {
        match *self {
            ColumnMetadata::BitsetLen { bits, .. } => bits,
            other => panic!("bits() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `Decimal` metadata.
    pub fn precision(&self) -> u8 {
        match *self {
            ColumnMetadata::Decimal { precision, .. } => precision,
            other => panic!("precision() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `Decimal` metadata.
    pub fn scale(&self) -> u8 {
        match *self {
            ColumnMetadata::Decimal { scale, .. } => scale,
            other => panic!("scale() called on {:?}", other),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is `TemporalV2` metadata.
    pub fn fractional_seconds_precision(&self) -> u8 {
        match *self {
            ColumnMetadata::TemporalV2 {
                fractional_seconds_precision,
            } => fractional_seconds_precision,
            other => panic!("fractional_seconds_precision() called on {:?}", other),
        }
    }

    /// Effective real type and maximum byte length of a CHAR/BINARY/ENUM/SET column.
    ///
    /// The server folds the high bits of lengths over 255 into the real-type
    /// byte; when both of the `0x30` bits are set the byte is the plain type.
    ///
    /// # Panics
    ///
    /// Panics unless this is `StringLike` metadata.
    pub fn string_type_and_length(&self) -> (u8, u16) {
        let (real_type, pack_size) = match *self {
            ColumnMetadata::StringLike {
                real_type,
                pack_size,
            } => (real_type, pack_size),
            other => panic!("string_type_and_length() called on {:?}", other),
        };

        if real_type & 0x30 != 0x30 {
            let high = (((real_type & 0x30) ^ 0x30) as u16) << 4;
            (real_type | 0x30, high | pack_size as u16)
        } else {
            (real_type, pack_size as u16)
        }
    }
}
