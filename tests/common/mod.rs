#![allow(dead_code)]

use binlog_capture::config::{Config, ErrorPolicy};
use bytes::{BufMut, BytesMut};
use std::path::{Path, PathBuf};

pub const TIMESTAMP: u32 = 1_697_365_800;
pub const SERVER_ID: u32 = 1;

pub const TABLE_MAP_EVENT: u8 = 19;
pub const WRITE_ROWS_EVENT: u8 = 30;
pub const UPDATE_ROWS_EVENT: u8 = 31;
pub const DELETE_ROWS_EVENT: u8 = 32;
pub const QUERY_EVENT: u8 = 2;
pub const XID_EVENT: u8 = 16;

const FORMAT_DESCRIPTION_EVENT: u8 = 15;
const HEADER_LEN: usize = 19;

pub const MYSQL_TYPE_LONG: u8 = 3;
pub const MYSQL_TYPE_VARCHAR: u8 = 15;
pub const MYSQL_TYPE_GEOMETRY: u8 = 255;

/// Writes binlog files event by event, the way a 5.7 server with
/// `binlog_checksum=CRC32` lays them out.
pub struct BinlogWriter {
    buf: Vec<u8>,
}

impl BinlogWriter {
    /// A log opening with a format description event from `server_version`,
    /// which must be 5.6.1 or later.
    pub fn new(server_version: &str) -> Self {
        let mut writer = Self {
            buf: vec![0xfe, b'b', b'i', b'n'],
        };

        let mut body = BytesMut::new();
        body.put_u16_le(4);
        let mut version = [0u8; 50];
        version[..server_version.len()].copy_from_slice(server_version.as_bytes());
        body.put_slice(&version);
        body.put_u32_le(TIMESTAMP);
        body.put_u8(HEADER_LEN as u8);
        let mut lengths = vec![0u8; 40];
        lengths[TABLE_MAP_EVENT as usize - 1] = 8;
        for code in [WRITE_ROWS_EVENT, UPDATE_ROWS_EVENT, DELETE_ROWS_EVENT] {
            lengths[code as usize - 1] = 10;
        }
        body.put_slice(&lengths);
        body.put_u8(1);

        writer.append(FORMAT_DESCRIPTION_EVENT, &body);
        writer
    }

    pub fn event(mut self, type_code: u8, body: &[u8]) -> Self {
        self.append(type_code, body);
        self
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, &self.buf).unwrap();
    }

    fn append(&mut self, type_code: u8, body: &[u8]) {
        let start = self.buf.len();
        let length = (HEADER_LEN + body.len() + 4) as u32;

        self.buf.extend_from_slice(&TIMESTAMP.to_le_bytes());
        self.buf.push(type_code);
        self.buf.extend_from_slice(&SERVER_ID.to_le_bytes());
        self.buf.extend_from_slice(&length.to_le_bytes());
        self.buf.extend_from_slice(&(start as u32 + length).to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        self.buf.extend_from_slice(body);

        let crc = crc32fast::hash(&self.buf[start..]);
        self.buf.extend_from_slice(&crc.to_le_bytes());
    }
}

/// `orders(id INT NOT NULL, note VARCHAR(64) NULL)` as table 42 in `shop`.
pub fn orders_table_map() -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_uint_le(42, 6);
    body.put_u16_le(1);
    put_name(&mut body, "shop");
    put_name(&mut body, "orders");
    body.put_u8(2);
    body.put_slice(&[MYSQL_TYPE_LONG, MYSQL_TYPE_VARCHAR]);
    body.put_u8(2);
    body.put_u16_le(64);
    body.put_u8(0b10);
    body.to_vec()
}

/// A table whose only column is a geometry, which cells cannot decode.
pub fn shapes_table_map() -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_uint_le(7, 6);
    body.put_u16_le(1);
    put_name(&mut body, "gis");
    put_name(&mut body, "shapes");
    body.put_u8(1);
    body.put_u8(MYSQL_TYPE_GEOMETRY);
    body.put_u8(1);
    body.put_u8(4);
    body.put_u8(0);
    body.to_vec()
}

/// An order row: the id, and the note or NULL.
pub type OrderRow = (u32, Option<&'static str>);

/// A v2 rows event against the orders table. Update events take
/// alternating before and after rows.
pub fn orders_rows(type_code: u8, rows: &[OrderRow]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_uint_le(42, 6);
    body.put_u16_le(1);
    body.put_u16_le(2);
    body.put_u8(2);
    body.put_u8(0b11);
    if type_code == UPDATE_ROWS_EVENT {
        body.put_u8(0b11);
    }

    for (id, note) in rows {
        body.put_u8(if note.is_none() { 0b10 } else { 0 });
        body.put_u32_le(*id);
        if let Some(note) = note {
            body.put_u8(note.len() as u8);
            body.put_slice(note.as_bytes());
        }
    }
    body.to_vec()
}

/// A one-row insert into the shapes table.
pub fn shapes_insert() -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_uint_le(7, 6);
    body.put_u16_le(1);
    body.put_u16_le(2);
    body.put_u8(1);
    body.put_u8(0b1);
    body.put_u8(0);
    body.put_u32_le(4);
    body.put_slice(&[0, 0, 0, 0]);
    body.to_vec()
}

pub fn xid(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

fn put_name(body: &mut BytesMut, name: &str) {
    body.put_u8(name.len() as u8);
    body.put_slice(name.as_bytes());
    body.put_u8(0);
}

/// Configuration for decoding `binlog` with checkpoints in `dir`.
pub fn test_config(binlog: &Path, dir: &Path) -> Config {
    let mut config = Config::for_path(binlog);
    config.replication.checkpoint_file = Some(checkpoint_path(dir));
    config.replication.checkpoint_interval_events = 2;
    config.replication.on_error = ErrorPolicy::Fail;
    config
}

pub fn checkpoint_path(dir: &Path) -> PathBuf {
    dir.join("checkpoint.json")
}

/// Parses JSON lines output.
pub fn parse_lines(output: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
