//! Sequential reader over one binlog file.

use bytes::{Buf, Bytes};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{info, trace, warn};

use super::codec::skip;
use super::constants::{
    BINLOG_MAGIC, CHECKSUM_LEN, EVENT_HEADER_LEN, EVENT_LEN_OFFSET, EVENT_TYPE_OFFSET,
    FLAGS_OFFSET, LOG_EVENT_BINLOG_IN_USE_F,
};
use super::decoder::EventDecoder;
use super::format::{ChecksumAlgorithm, FormatDescription};
use super::header::{determine_log_version, EventHeader};
use super::schema::SchemaCache;
use super::types::Event;
use crate::{Error, Result};

/// Offset of the first event, right after the magic bytes.
const FIRST_EVENT_POSITION: u64 = BINLOG_MAGIC.len() as u64;

const SUPPORTED_LOG_VERSION: u8 = 4;

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Verify CRC32 event checksums when the log declares them.
    pub verify_checksums: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Decodes the events of one binlog in order.
///
/// The stream owns its byte source and the table maps seen so far. It is not
/// meant to be shared; decode independent files with independent streams.
pub struct LogStream<R> {
    reader: R,
    options: StreamOptions,
    log_version: u8,
    format: FormatDescription,
    decoder: EventDecoder,
    /// Offset of the next event to decode.
    position: u64,
    /// False after a failed read left the reader somewhere inside an event.
    in_sync: bool,
    /// Where the last failed event ends, if its header was readable.
    resume_at: Option<u64>,
    /// Set once the iterator has yielded an error.
    fused: bool,
}

impl LogStream<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, StreamOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: StreamOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!("Opening binlog {}", path.display());
        LogStream::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> LogStream<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, StreamOptions::default())
    }

    /// Validates the magic bytes, detects the log version from the first
    /// event and decodes its format description. The stream is left at the
    /// second event.
    pub fn with_options(mut reader: R, options: StreamOptions) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 4];
        read_exact_at(&mut reader, 0, &mut magic)?;
        if magic != BINLOG_MAGIC {
            return Err(Error::MalformedMagic { found: magic });
        }

        let mut type_code = [0u8; 1];
        read_exact_at(&mut reader, FIRST_EVENT_POSITION + EVENT_TYPE_OFFSET, &mut type_code)?;
        let mut length = [0u8; 4];
        read_exact_at(&mut reader, FIRST_EVENT_POSITION + EVENT_LEN_OFFSET, &mut length)?;

        let log_version = determine_log_version(type_code[0], u32::from_le_bytes(length));
        if log_version != SUPPORTED_LOG_VERSION {
            return Err(Error::UnsupportedLogVersion {
                version: log_version,
            });
        }

        reader.seek(SeekFrom::Start(FIRST_EVENT_POSITION))?;
        let (header, mut header_bytes, mut body) = read_event(&mut reader, FIRST_EVENT_POSITION)?;
        let format = FormatDescription::decode(body.clone())?;

        if format.checksum == ChecksumAlgorithm::Crc32 && options.verify_checksums {
            // The server checksums the format description as if the file
            // were already closed.
            let flags = header.flags & !LOG_EVENT_BINLOG_IN_USE_F;
            header_bytes[FLAGS_OFFSET..FLAGS_OFFSET + 2].copy_from_slice(&flags.to_le_bytes());

            let trailer = body.split_off(body.len() - CHECKSUM_LEN);
            verify_checksum(FIRST_EVENT_POSITION, &header_bytes, &body, trailer)?;
        }

        if header.flags & LOG_EVENT_BINLOG_IN_USE_F != 0 {
            info!("Binlog is still open on the server or was not closed cleanly");
        }

        info!(
            "Binlog v{} from server {} (checksum: {:?})",
            log_version, format.server_version, format.checksum
        );

        let position = header.next_event_position(FIRST_EVENT_POSITION);
        reader.seek(SeekFrom::Start(position))?;

        Ok(Self {
            reader,
            options,
            log_version,
            format,
            decoder: EventDecoder::new(),
            position,
            in_sync: true,
            resume_at: None,
            fused: false,
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn log_version(&self) -> u8 {
        self.log_version
    }

    pub fn format_description(&self) -> &FormatDescription {
        &self.format
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        self.decoder.schema_cache()
    }

    /// Moves to the event starting at `position`, e.g. a checkpoint.
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        if position < FIRST_EVENT_POSITION {
            return Err(Error::InvalidMessage {
                message: format!("Cannot seek into the magic bytes: {}", position),
            });
        }
        self.reader.seek(SeekFrom::Start(position))?;
        self.position = position;
        self.in_sync = true;
        self.resume_at = None;
        self.fused = false;
        Ok(())
    }

    /// Skips past the last event whose body failed to decode.
    ///
    /// Returns `false` when there is nothing to skip to, either because the
    /// last call succeeded or because the failing event's header itself was
    /// unreadable.
    pub fn skip_failed_event(&mut self) -> Result<bool> {
        match self.resume_at.take() {
            Some(next) => {
                warn!("Skipping failed event at {}, resuming at {}", self.position, next);
                self.seek_to(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Decodes the next event.
    ///
    /// Returns `Ok(None)` at a clean end of stream. After an error the same
    /// event is retried on the next call unless `skip_failed_event` is used.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if !self.in_sync {
            self.reader.seek(SeekFrom::Start(self.position))?;
            self.in_sync = true;
        }
        self.resume_at = None;

        let position = self.position;
        let mut header_bytes = [0u8; EVENT_HEADER_LEN];
        self.in_sync = false;
        let read = read_full(&mut self.reader, &mut header_bytes)?;
        if read == 0 {
            self.in_sync = true;
            return Ok(None);
        }
        if read < EVENT_HEADER_LEN {
            return Err(Error::TruncatedRead {
                needed: EVENT_HEADER_LEN,
                available: read,
            });
        }

        let header = EventHeader::decode(&mut &header_bytes[..])?;
        trace!("Event header at {}: {:?}", position, header);

        let body_len = header.body_len(position)?;
        let next = header.next_event_position(position);
        if next <= position {
            return Err(Error::InvalidEventLength {
                length: header.length,
                position,
            });
        }
        self.resume_at = Some(next);

        let mut body = read_body(&mut self.reader, body_len)?;

        let trailer_len = self.format.checksum.trailer_len();
        if trailer_len > 0 {
            if body.len() < trailer_len {
                return Err(Error::TruncatedRead {
                    needed: trailer_len,
                    available: body.len(),
                });
            }
            let trailer = body.split_off(body.len() - trailer_len);
            if self.options.verify_checksums {
                verify_checksum(position, &header_bytes, &body, trailer)?;
            }
        }

        skip(&mut body, self.format.extra_header_len())?;

        let payload = self.decoder.decode(&header, body)?;

        if next != position + header.length as u64 {
            self.reader.seek(SeekFrom::Start(next))?;
        }
        self.position = next;
        self.in_sync = true;
        self.resume_at = None;

        Ok(Some(Event {
            header,
            position,
            payload,
        }))
    }
}

/// Yields events until the end of the stream or the first error.
impl<R: Read + Seek> Iterator for LogStream<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        let item = self.next_event().transpose();
        if matches!(item, Some(Err(_))) {
            self.fused = true;
        }
        item
    }
}

type RawEvent = (EventHeader, [u8; EVENT_HEADER_LEN], Bytes);

fn read_event<R: Read>(reader: &mut R, position: u64) -> Result<RawEvent> {
    let mut header_bytes = [0u8; EVENT_HEADER_LEN];
    let read = read_full(reader, &mut header_bytes)?;
    if read < EVENT_HEADER_LEN {
        return Err(Error::TruncatedRead {
            needed: EVENT_HEADER_LEN,
            available: read,
        });
    }

    let header = EventHeader::decode(&mut &header_bytes[..])?;
    let body = read_body(reader, header.body_len(position)?)?;
    Ok((header, header_bytes, body))
}

/// Reads `len` body bytes. The buffer grows with what the source actually
/// holds, so a corrupt length cannot force a huge allocation.
fn read_body<R: Read>(reader: &mut R, len: usize) -> Result<Bytes> {
    let mut body = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut body)?;
    if body.len() < len {
        return Err(Error::TruncatedRead {
            needed: len,
            available: body.len(),
        });
    }
    Ok(Bytes::from(body))
}

fn read_exact_at<R: Read + Seek>(reader: &mut R, offset: u64, buf: &mut [u8]) -> Result<()> {
    reader.seek(SeekFrom::Start(offset))?;
    let read = read_full(reader, buf)?;
    if read < buf.len() {
        return Err(Error::TruncatedRead {
            needed: buf.len(),
            available: read,
        });
    }
    Ok(())
}

/// Fills `buf` as far as the source allows, returning the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Checks the CRC32 trailer of an event against its header and body.
fn verify_checksum(
    position: u64,
    header: &[u8],
    body: &[u8],
    mut trailer: Bytes,
) -> Result<()> {
    let expected = trailer.get_u32_le();

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header);
    hasher.update(body);
    let computed = hasher.finalize();

    if computed != expected {
        return Err(Error::ChecksumMismatch {
            position,
            expected,
            computed,
        });
    }
    Ok(())
}
