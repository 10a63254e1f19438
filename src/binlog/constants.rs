//! Wire constants: magic number, header layout, event and column type codes.

use std::convert::TryFrom;

/// The four bytes every binlog file starts with.
pub const BINLOG_MAGIC: [u8; 4] = [0xfe, b'b', b'i', b'n'];

/// Size of the fixed v4 event header.
pub const EVENT_HEADER_LEN: usize = 19;

// Offsets inside the fixed header, relative to the start of an event.
pub const EVENT_TYPE_OFFSET: u64 = 4;
pub const EVENT_LEN_OFFSET: u64 = 9;
pub const FLAGS_OFFSET: usize = 17;

/// Event length below which a start-v3 first event indicates a version 1 log.
pub const START_V3_MIN_V3_LENGTH: u32 = 75;

/// Length of the CRC32 suffix on checksummed events.
pub const CHECKSUM_LEN: usize = 4;

/// Header flag set while the server still has the file open. The format
/// description checksum is computed with it cleared.
pub const LOG_EVENT_BINLOG_IN_USE_F: u16 = 0x0001;

/// Rows-event flag marking the last event of a statement.
pub const ROWS_FLAG_STMT_END: u16 = 0x0001;

/// Binlog event type codes.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    UNKNOWN_EVENT = 0,
    START_EVENT_V3 = 1,
    QUERY_EVENT = 2,
    STOP_EVENT = 3,
    ROTATE_EVENT = 4,
    INTVAR_EVENT = 5,
    LOAD_EVENT = 6,
    SLAVE_EVENT = 7,
    CREATE_FILE_EVENT = 8,
    APPEND_BLOCK_EVENT = 9,
    EXEC_LOAD_EVENT = 10,
    DELETE_FILE_EVENT = 11,
    NEW_LOAD_EVENT = 12,
    RAND_EVENT = 13,
    USER_VAR_EVENT = 14,
    FORMAT_DESCRIPTION_EVENT = 15,
    XID_EVENT = 16,
    BEGIN_LOAD_QUERY_EVENT = 17,
    EXECUTE_LOAD_QUERY_EVENT = 18,
    TABLE_MAP_EVENT = 19,
    PRE_GA_WRITE_ROWS_EVENT = 20,
    PRE_GA_UPDATE_ROWS_EVENT = 21,
    PRE_GA_DELETE_ROWS_EVENT = 22,
    WRITE_ROWS_EVENT_V1 = 23,
    UPDATE_ROWS_EVENT_V1 = 24,
    DELETE_ROWS_EVENT_V1 = 25,
    INCIDENT_EVENT = 26,
    HEARTBEAT_EVENT = 27,
    IGNORABLE_EVENT = 28,
    ROWS_QUERY_EVENT = 29,
    WRITE_ROWS_EVENT = 30,
    UPDATE_ROWS_EVENT = 31,
    DELETE_ROWS_EVENT = 32,
    GTID_EVENT = 33,
    ANONYMOUS_GTID_EVENT = 34,
    PREVIOUS_GTIDS_EVENT = 35,
    TRANSACTION_CONTEXT_EVENT = 36,
    VIEW_CHANGE_EVENT = 37,
    XA_PREPARE_LOG_EVENT = 38,
    PARTIAL_UPDATE_ROWS_EVENT = 39,
    TRANSACTION_PAYLOAD_EVENT = 40,
}

impl TryFrom<u8> for EventType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        use EventType::*;

        Ok(match byte {
            0 => UNKNOWN_EVENT,
            1 => START_EVENT_V3,
            2 => QUERY_EVENT,
            3 => STOP_EVENT,
            4 => ROTATE_EVENT,
            5 => INTVAR_EVENT,
            6 => LOAD_EVENT,
            7 => SLAVE_EVENT,
            8 => CREATE_FILE_EVENT,
            9 => APPEND_BLOCK_EVENT,
            10 => EXEC_LOAD_EVENT,
            11 => DELETE_FILE_EVENT,
            12 => NEW_LOAD_EVENT,
            13 => RAND_EVENT,
            14 => USER_VAR_EVENT,
            15 => FORMAT_DESCRIPTION_EVENT,
            16 => XID_EVENT,
            17 => BEGIN_LOAD_QUERY_EVENT,
            18 => EXECUTE_LOAD_QUERY_EVENT,
            19 => TABLE_MAP_EVENT,
            20 => PRE_GA_WRITE_ROWS_EVENT,
            21 => PRE_GA_UPDATE_ROWS_EVENT,
            22 => PRE_GA_DELETE_ROWS_EVENT,
            23 => WRITE_ROWS_EVENT_V1,
            24 => UPDATE_ROWS_EVENT_V1,
            25 => DELETE_ROWS_EVENT_V1,
            26 => INCIDENT_EVENT,
            27 => HEARTBEAT_EVENT,
            28 => IGNORABLE_EVENT,
            29 => ROWS_QUERY_EVENT,
            30 => WRITE_ROWS_EVENT,
            31 => UPDATE_ROWS_EVENT,
            32 => DELETE_ROWS_EVENT,
            33 => GTID_EVENT,
            34 => ANONYMOUS_GTID_EVENT,
            35 => PREVIOUS_GTIDS_EVENT,
            36 => TRANSACTION_CONTEXT_EVENT,
            37 => VIEW_CHANGE_EVENT,
            38 => XA_PREPARE_LOG_EVENT,
            39 => PARTIAL_UPDATE_ROWS_EVENT,
            40 => TRANSACTION_PAYLOAD_EVENT,
            x => return Err(x),
        })
    }
}

/// Column type codes as stored in table map events.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0,
    MYSQL_TYPE_TINY = 1,
    MYSQL_TYPE_SHORT = 2,
    MYSQL_TYPE_LONG = 3,
    MYSQL_TYPE_FLOAT = 4,
    MYSQL_TYPE_DOUBLE = 5,
    MYSQL_TYPE_NULL = 6,
    MYSQL_TYPE_TIMESTAMP = 7,
    MYSQL_TYPE_LONGLONG = 8,
    MYSQL_TYPE_INT24 = 9,
    MYSQL_TYPE_DATE = 10,
    MYSQL_TYPE_TIME = 11,
    MYSQL_TYPE_DATETIME = 12,
    MYSQL_TYPE_YEAR = 13,
    MYSQL_TYPE_NEWDATE = 14,
    MYSQL_TYPE_VARCHAR = 15,
    MYSQL_TYPE_BIT = 16,
    MYSQL_TYPE_TIMESTAMP2 = 17,
    MYSQL_TYPE_DATETIME2 = 18,
    MYSQL_TYPE_TIME2 = 19,
    MYSQL_TYPE_JSON = 245,
    MYSQL_TYPE_NEWDECIMAL = 246,
    MYSQL_TYPE_ENUM = 247,
    MYSQL_TYPE_SET = 248,
    MYSQL_TYPE_TINY_BLOB = 249,
    MYSQL_TYPE_MEDIUM_BLOB = 250,
    MYSQL_TYPE_LONG_BLOB = 251,
    MYSQL_TYPE_BLOB = 252,
    MYSQL_TYPE_VAR_STRING = 253,
    MYSQL_TYPE_STRING = 254,
    MYSQL_TYPE_GEOMETRY = 255,
}

impl TryFrom<u8> for ColumnType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        use ColumnType::*;

        Ok(match byte {
            0 => MYSQL_TYPE_DECIMAL,
            1 => MYSQL_TYPE_TINY,
            2 => MYSQL_TYPE_SHORT,
            3 => MYSQL_TYPE_LONG,
            4 => MYSQL_TYPE_FLOAT,
            5 => MYSQL_TYPE_DOUBLE,
            6 => MYSQL_TYPE_NULL,
            7 => MYSQL_TYPE_TIMESTAMP,
            8 => MYSQL_TYPE_LONGLONG,
            9 => MYSQL_TYPE_INT24,
            10 => MYSQL_TYPE_DATE,
            11 => MYSQL_TYPE_TIME,
            12 => MYSQL_TYPE_DATETIME,
            13 => MYSQL_TYPE_YEAR,
            14 => MYSQL_TYPE_NEWDATE,
            15 => MYSQL_TYPE_VARCHAR,
            16 => MYSQL_TYPE_BIT,
            17 => MYSQL_TYPE_TIMESTAMP2,
            18 => MYSQL_TYPE_DATETIME2,
            19 => MYSQL_TYPE_TIME2,
            245 => MYSQL_TYPE_JSON,
            246 => MYSQL_TYPE_NEWDECIMAL,
            247 => MYSQL_TYPE_ENUM,
            248 => MYSQL_TYPE_SET,
            249 => MYSQL_TYPE_TINY_BLOB,
            250 => MYSQL_TYPE_MEDIUM_BLOB,
            251 => MYSQL_TYPE_LONG_BLOB,
            252 => MYSQL_TYPE_BLOB,
            253 => MYSQL_TYPE_VAR_STRING,
            254 => MYSQL_TYPE_STRING,
            255 => MYSQL_TYPE_GEOMETRY,
            x => return Err(x),
        })
    }
}
