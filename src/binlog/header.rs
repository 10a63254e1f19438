use bytes::Buf;
use serde::Serialize;

use super::codec::{read_u16_le, read_u32_le, read_u8};
use super::constants::{EventType, EVENT_HEADER_LEN, START_V3_MIN_V3_LENGTH};
use crate::{Error, Result};

/// The fixed 19-byte prefix of every v4 event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventHeader {
    pub timestamp: u32,
    pub type_code: u8,
    pub server_id: u32,
    /// Total event length, header included.
    pub length: u32,
    /// Stream offset of the following event.
    pub next_position: u32,
    pub flags: u16,
}

impl EventHeader {
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        Ok(Self {
            timestamp: read_u32_le(buf)?,
            type_code: read_u8(buf)?,
            server_id: read_u32_le(buf)?,
            length: read_u32_le(buf)?,
            next_position: read_u32_le(buf)?,
            flags: read_u16_le(buf)?,
        })
    }

    pub fn event_type(&self) -> Option<EventType> {
        EventType::try_from(self.type_code).ok()
    }

    /// Bytes following the fixed header, checksum included.
    ///
    /// `position` is only used for error reporting.
    pub fn body_len(&self, position: u64) -> Result<usize> {
        (self.length as usize)
            .checked_sub(EVENT_HEADER_LEN)
            .ok_or(Error::InvalidEventLength {
                length: self.length,
                position,
            })
    }

    /// Offset of the next event for an event starting at `position`.
    ///
    /// Some writers leave `next_position` at zero; the declared length is
    /// used then.
    pub fn next_event_position(&self, position: u64) -> u64 {
        if self.next_position == 0 {
            position + self.length as u64
        } else {
            self.next_position as u64
        }
    }
}

/// Binlog format version implied by the first event of a file.
///
/// A format description first event means version 4; a start-v3 event means
/// version 1 when shorter than 75 bytes and version 3 otherwise; any other
/// first event means version 3.
pub fn determine_log_version(type_code: u8, length: u32) -> u8 {
    match EventType::try_from(type_code) {
        Ok(EventType::FORMAT_DESCRIPTION_EVENT) => 4,
        Ok(EventType::START_EVENT_V3) if length < START_V3_MIN_V3_LENGTH => 1,
        _ => 3,
    }
}
