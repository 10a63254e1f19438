use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{
    ColumnType, EventType, BINLOG_MAGIC, EVENT_HEADER_LEN, FLAGS_OFFSET, LOG_EVENT_BINLOG_IN_USE_F,
};
use super::format::ChecksumAlgorithm;

pub const TEST_TIMESTAMP: u32 = 1_697_365_800; // 2023-10-15 10:30:00 UTC
pub const TEST_SERVER_ID: u32 = 1;

/// Writes `value` as a length-encoded integer.
pub fn put_packed_integer(buf: &mut BytesMut, value: u64) {
    if value <= 250 {
        buf.put_u8(value as u8);
    } else if value <= 0xffff {
        buf.put_u8(252);
        buf.put_u16_le(value as u16);
    } else if value <= 0xff_ffff {
        buf.put_u8(253);
        buf.put_uint_le(value, 3);
    } else {
        buf.put_u8(254);
        buf.put_u64_le(value);
    }
}

/// The 19-byte common header.
pub fn header_bytes(
    timestamp: u32,
    type_code: u8,
    server_id: u32,
    length: u32,
    next_position: u32,
    flags: u16,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(EVENT_HEADER_LEN);
    buf.put_u32_le(timestamp);
    buf.put_u8(type_code);
    buf.put_u32_le(server_id);
    buf.put_u32_le(length);
    buf.put_u32_le(next_position);
    buf.put_u16_le(flags);
    buf.freeze()
}

/// Post-header lengths as a 5.7 server writes them, for type codes 1..=40.
fn post_header_lengths() -> Vec<u8> {
    let mut lengths = vec![0u8; 40];
    let mut set = |event_type: EventType, len: u8| lengths[event_type as usize - 1] = len;

    set(EventType::START_EVENT_V3, 56);
    set(EventType::QUERY_EVENT, 13);
    set(EventType::ROTATE_EVENT, 8);
    set(EventType::FORMAT_DESCRIPTION_EVENT, 84);
    set(EventType::TABLE_MAP_EVENT, 8);
    set(EventType::PRE_GA_WRITE_ROWS_EVENT, 8);
    set(EventType::PRE_GA_UPDATE_ROWS_EVENT, 8);
    set(EventType::PRE_GA_DELETE_ROWS_EVENT, 8);
    set(EventType::WRITE_ROWS_EVENT_V1, 8);
    set(EventType::UPDATE_ROWS_EVENT_V1, 8);
    set(EventType::DELETE_ROWS_EVENT_V1, 8);
    set(EventType::WRITE_ROWS_EVENT, 10);
    set(EventType::UPDATE_ROWS_EVENT, 10);
    set(EventType::DELETE_ROWS_EVENT, 10);
    set(EventType::GTID_EVENT, 42);
    set(EventType::ANONYMOUS_GTID_EVENT, 42);

    lengths
}

/// A format description body. With `checksum` set, the algorithm byte and a
/// zeroed CRC slot are appended.
pub fn format_description_body(server_version: &str, checksum: Option<ChecksumAlgorithm>) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u16_le(4);

    let mut version = [0u8; 50];
    version[..server_version.len()].copy_from_slice(server_version.as_bytes());
    buf.put_slice(&version);

    buf.put_u32_le(TEST_TIMESTAMP);
    buf.put_u8(EVENT_HEADER_LEN as u8);
    buf.put_slice(&post_header_lengths());

    if let Some(algorithm) = checksum {
        buf.put_u8(match algorithm {
            ChecksumAlgorithm::Off => 0,
            ChecksumAlgorithm::Crc32 => 1,
        });
        buf.put_u32_le(0);
    }

    buf.freeze()
}

/// Chainable builder for raw event bodies.
pub struct MockEventBuilder {
    buf: BytesMut,
}

impl MockEventBuilder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn table_id(mut self, table_id: u64) -> Self {
        self.buf.put_uint_le(table_id, 6);
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.buf.put_u16_le(flags);
        self
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.put_u8(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn packed(mut self, value: u64) -> Self {
        put_packed_integer(&mut self.buf, value);
        self
    }

    /// Length byte, name, NUL terminator.
    pub fn name(mut self, name: &str) -> Self {
        self.buf.put_u8(name.len() as u8);
        self.buf.put_slice(name.as_bytes());
        self.buf.put_u8(0);
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// A column of a mock table: type code plus raw table map metadata.
#[derive(Debug, Clone)]
pub struct MockColumn {
    pub column_type: u8,
    pub metadata: Vec<u8>,
    pub nullable: bool,
}

impl MockColumn {
    pub fn long() -> Self {
        Self::of(ColumnType::MYSQL_TYPE_LONG, &[])
    }

    pub fn longlong() -> Self {
        Self::of(ColumnType::MYSQL_TYPE_LONGLONG, &[])
    }

    pub fn varchar(max_length: u16) -> Self {
        Self::of(ColumnType::MYSQL_TYPE_VARCHAR, &max_length.to_le_bytes())
    }

    pub fn double() -> Self {
        Self::of(ColumnType::MYSQL_TYPE_DOUBLE, &[8])
    }

    pub fn blob(pack_size: u8) -> Self {
        Self::of(ColumnType::MYSQL_TYPE_BLOB, &[pack_size])
    }

    pub fn datetime2(precision: u8) -> Self {
        Self::of(ColumnType::MYSQL_TYPE_DATETIME2, &[precision])
    }

    pub fn of(column_type: ColumnType, metadata: &[u8]) -> Self {
        Self {
            column_type: column_type as u8,
            metadata: metadata.to_vec(),
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A table whose table map and row images can be encoded.
#[derive(Debug, Clone)]
pub struct MockTable {
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub columns: Vec<MockColumn>,
}

/// Encoded cell bytes, or `None` for SQL NULL.
pub type MockRow = Vec<Option<Vec<u8>>>;

impl MockTable {
    pub fn new(table_id: u64, database: &str, table: &str, columns: Vec<MockColumn>) -> Self {
        Self {
            table_id,
            database: database.to_string(),
            table: table.to_string(),
            columns,
        }
    }

    pub fn table_map_body(&self) -> Vec<u8> {
        let types: Vec<u8> = self.columns.iter().map(|c| c.column_type).collect();
        let metadata: Vec<u8> = self.columns.iter().flat_map(|c| c.metadata.clone()).collect();
        let nullable = pack_bits(&self.columns.iter().map(|c| c.nullable).collect::<Vec<_>>());

        MockEventBuilder::new()
            .table_id(self.table_id)
            .flags(1)
            .name(&self.database)
            .name(&self.table)
            .packed(types.len() as u64)
            .bytes(&types)
            .packed(metadata.len() as u64)
            .bytes(&metadata)
            .bytes(&nullable)
            .build()
    }

    /// A v2 rows event body with every column used. For updates, `rows`
    /// holds alternating before and after images.
    pub fn rows_body(&self, event_type: EventType, rows: &[MockRow]) -> Vec<u8> {
        let all = vec![true; self.columns.len()];
        self.rows_body_with(event_type, &all, rows)
    }

    /// Like `rows_body` with an explicit used-columns list. Rows carry one
    /// entry per used column.
    pub fn rows_body_with(
        &self,
        event_type: EventType,
        used: &[bool],
        rows: &[MockRow],
    ) -> Vec<u8> {
        let used_bits = pack_bits(used);

        let mut builder = MockEventBuilder::new()
            .table_id(self.table_id)
            .flags(1);
        if matches!(
            event_type,
            EventType::WRITE_ROWS_EVENT
                | EventType::UPDATE_ROWS_EVENT
                | EventType::DELETE_ROWS_EVENT
        ) {
            builder = builder.u16(2);
        }
        builder = builder.packed(used.len() as u64).bytes(&used_bits);
        if matches!(
            event_type,
            EventType::UPDATE_ROWS_EVENT
                | EventType::UPDATE_ROWS_EVENT_V1
                | EventType::PRE_GA_UPDATE_ROWS_EVENT
        ) {
            builder = builder.bytes(&used_bits);
        }

        for row in rows {
            let nulls: Vec<bool> = row.iter().map(|cell| cell.is_none()).collect();
            builder = builder.bytes(&pack_bits(&nulls));
            for cell in row.iter().flatten() {
                builder = builder.bytes(cell);
            }
        }

        builder.build()
    }
}

/// Packs flags least significant bit first.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; (bits.len() + 7) / 8];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

/// A varchar cell with a one-byte length prefix.
pub fn short_string(value: &str) -> Vec<u8> {
    let mut out = vec![value.len() as u8];
    out.extend_from_slice(value.as_bytes());
    out
}

/// Builds a complete binlog image in memory.
pub struct MockLogBuilder {
    server_version: Option<String>,
    checksum: ChecksumAlgorithm,
    zero_next_positions: bool,
    in_use: bool,
    header_length: u8,
    events: Vec<(u8, Vec<u8>)>,
}

impl MockLogBuilder {
    /// A log opening with a format description from `server_version`.
    pub fn new(server_version: &str) -> Self {
        Self {
            server_version: Some(server_version.to_string()),
            checksum: ChecksumAlgorithm::Off,
            zero_next_positions: false,
            in_use: false,
            header_length: EVENT_HEADER_LEN as u8,
            events: Vec::new(),
        }
    }

    /// A log whose first event is whatever is added first.
    pub fn without_format_description() -> Self {
        Self {
            server_version: None,
            ..Self::new("")
        }
    }

    /// Only meaningful for server versions that write checksums (5.6.1+).
    pub fn checksum(mut self, checksum: ChecksumAlgorithm) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn zero_next_positions(mut self) -> Self {
        self.zero_next_positions = true;
        self
    }

    /// Marks the format description with the in-use flag, as a server does
    /// for its active log. Its CRC is still computed with the flag cleared.
    pub fn in_use(mut self) -> Self {
        self.in_use = true;
        self
    }

    /// Declares a longer common header. Events after the format description
    /// get zeroed padding after their 19 fixed header bytes.
    pub fn header_length(mut self, header_length: u8) -> Self {
        self.header_length = header_length;
        self
    }

    pub fn event(mut self, type_code: u8, body: &[u8]) -> Self {
        self.events.push((type_code, body.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = BINLOG_MAGIC.to_vec();
        let crc = self.checksum == ChecksumAlgorithm::Crc32;

        if let Some(version) = &self.server_version {
            let checksum_aware = !version.starts_with("5.0")
                && !version.starts_with("5.1")
                && !version.starts_with("5.5");
            let body = format_description_body(version, checksum_aware.then_some(self.checksum));
            // The zeroed CRC slot is already part of the body.
            let mut body = body[..body.len() - if checksum_aware { 4 } else { 0 }].to_vec();
            body[HEADER_LENGTH_OFFSET] = self.header_length;

            let flags = if self.in_use { LOG_EVENT_BINLOG_IN_USE_F } else { 0 };
            let fde = RawEvent {
                type_code: EventType::FORMAT_DESCRIPTION_EVENT as u8,
                body: &body,
                flags,
                padding: 0,
            };
            self.append(&mut out, fde, checksum_aware, crc);
        }

        let padding = self.header_length as usize - EVENT_HEADER_LEN;
        for (type_code, body) in &self.events {
            let event = RawEvent {
                type_code: *type_code,
                body,
                flags: 0,
                padding,
            };
            self.append(&mut out, event, crc, crc);
        }

        out
    }

    /// Appends one event. With `trailer` set, 4 checksum bytes follow the
    /// body; they hold a real CRC32 only when `compute` is set. The CRC
    /// always covers the header with the in-use flag cleared.
    fn append(&self, out: &mut Vec<u8>, event: RawEvent<'_>, trailer: bool, compute: bool) {
        let position = out.len() as u32;
        let length = (EVENT_HEADER_LEN + event.padding + event.body.len()) as u32
            + if trailer { 4 } else { 0 };
        let next_position = if self.zero_next_positions {
            0
        } else {
            position + length
        };

        let start = out.len();
        let header = header_bytes(
            TEST_TIMESTAMP,
            event.type_code,
            TEST_SERVER_ID,
            length,
            next_position,
            event.flags & !LOG_EVENT_BINLOG_IN_USE_F,
        );
        out.extend_from_slice(&header);
        out.extend(std::iter::repeat(0u8).take(event.padding));
        out.extend_from_slice(event.body);

        if trailer {
            let crc = if compute {
                crc32fast::hash(&out[start..])
            } else {
                0
            };
            out.extend_from_slice(&crc.to_le_bytes());
        }

        let flags = start + FLAGS_OFFSET;
        out[flags..flags + 2].copy_from_slice(&event.flags.to_le_bytes());
    }
}

/// Offset of the common header length byte in a format description body.
const HEADER_LENGTH_OFFSET: usize = 2 + 50 + 4;

struct RawEvent<'a> {
    type_code: u8,
    body: &'a [u8],
    flags: u16,
    padding: usize,
}
