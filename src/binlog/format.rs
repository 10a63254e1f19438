//! Decoding of the format description event that opens every v4 binlog.

use bytes::{Buf, Bytes};
use serde::Serialize;

use super::codec::{read_bytes, read_u16_le, read_u32_le, read_u8};
use super::constants::{CHECKSUM_LEN, EVENT_HEADER_LEN};
use crate::{Error, Result};

const SERVER_VERSION_LEN: usize = 50;

/// First server release whose format description carries a checksum algorithm.
const CHECKSUM_VERSION: (u8, u8, u8) = (5, 6, 1);

/// Checksum algorithm applied to every event after the format description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Off,
    Crc32,
}

impl ChecksumAlgorithm {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ChecksumAlgorithm::Off),
            1 => Ok(ChecksumAlgorithm::Crc32),
            other => Err(Error::InvalidMessage {
                message: format!("Unknown checksum algorithm: {}", other),
            }),
        }
    }

    /// Bytes this algorithm appends to each event.
    pub fn trailer_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Off => 0,
            ChecksumAlgorithm::Crc32 => CHECKSUM_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescription {
    pub binlog_version: u16,
    pub server_version: String,
    pub create_timestamp: u32,
    pub header_length: u8,
    /// Post-header length per event type, indexed by `type_code - 1`.
    pub post_header_lengths: Vec<u8>,
    pub checksum: ChecksumAlgorithm,
}

impl FormatDescription {
    /// Decodes a format description body, checksum suffix included.
    pub fn decode(mut body: Bytes) -> Result<Self> {
        let binlog_version = read_u16_le(&mut body)?;
        let raw_version = read_bytes(&mut body, SERVER_VERSION_LEN)?;
        let create_timestamp = read_u32_le(&mut body)?;
        let header_length = read_u8(&mut body)?;

        let nul = raw_version
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(raw_version.len());
        let server_version = String::from_utf8_lossy(&raw_version[..nul]).to_string();

        if (header_length as usize) < EVENT_HEADER_LEN {
            return Err(Error::InvalidMessage {
                message: format!("Invalid common header length: {}", header_length),
            });
        }

        // Checksum-aware servers append one algorithm byte and a CRC32.
        let checksum = if split_version(&server_version) >= CHECKSUM_VERSION {
            let suffix = 1 + CHECKSUM_LEN;
            if body.remaining() < suffix {
                return Err(Error::TruncatedRead {
                    needed: suffix,
                    available: body.remaining(),
                });
            }
            let algorithm = body[body.len() - suffix];
            body.truncate(body.len() - suffix);
            ChecksumAlgorithm::from_code(algorithm)?
        } else {
            ChecksumAlgorithm::Off
        };

        Ok(Self {
            binlog_version,
            server_version,
            create_timestamp,
            header_length,
            post_header_lengths: body.to_vec(),
            checksum,
        })
    }

    /// Bytes of extra common header following the fixed 19 bytes.
    pub fn extra_header_len(&self) -> usize {
        self.header_length as usize - EVENT_HEADER_LEN
    }
}

/// Parses the leading `major.minor.patch` of a server version string.
///
/// Missing or non-numeric components read as zero.
fn split_version(version: &str) -> (u8, u8, u8) {
    let mut parts = version.split('.').map(|part| {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u8>().unwrap_or(0)
    });

    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}
