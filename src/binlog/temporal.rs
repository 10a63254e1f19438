//! The bit-packed TIME2, DATETIME2 and TIMESTAMP2 cell formats.
//!
//! All three store a big-endian integer part followed by 0 to 3 bytes of
//! fractional seconds, the byte count depending on the column's declared
//! precision.

use bytes::Buf;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;

use super::codec::read_uint_be;
use crate::{Error, Result};

const TIME_INT_OFFSET: i64 = 0x80_0000;
const DATETIME_INT_OFFSET: u64 = 0x80_0000_0000;

/// Fractional-second bytes stored for precisions 0 through 6.
const FRACTION_BYTES: [usize; 7] = [0, 1, 1, 2, 2, 3, 3];

/// Number of fractional-second bytes for `precision`.
pub fn fraction_len(precision: u8) -> Result<usize> {
    FRACTION_BYTES
        .get(precision as usize)
        .copied()
        .ok_or_else(|| Error::InvalidMessage {
            message: format!("Invalid fractional seconds precision: {}", precision),
        })
}

/// Scales a stored fraction of `len` bytes to microseconds.
fn fraction_to_micros(fraction: u64, len: usize) -> u32 {
    let scale = match len {
        1 => 10_000,
        2 => 100,
        _ => 1,
    };
    (fraction * scale) as u32
}

fn read_fraction<B: Buf>(buf: &mut B, len: usize) -> Result<u64> {
    if len == 0 {
        return Ok(0);
    }
    read_uint_be(buf, len)
}

/// A TIME value, which may be negative and may exceed 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeValue {
    pub negative: bool,
    pub hours: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

impl TimeValue {
    pub fn to_duration(&self) -> Duration {
        let magnitude = Duration::hours(self.hours as i64)
            + Duration::minutes(self.minutes as i64)
            + Duration::seconds(self.seconds as i64)
            + Duration::microseconds(self.microseconds as i64);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)?;
        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }
        Ok(())
    }
}

impl Serialize for TimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A calendar date and time without a zone.
///
/// Zero dates (`0000-00-00`) and dates with a zero month or day are valid in
/// MySQL, so the fields are kept as stored and only converted to chrono on
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl DateTimeValue {
    pub fn zero() -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        }
    }

    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self {
            year: value.year() as u16,
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
            microsecond: value.nanosecond() / 1_000,
        }
    }

    /// `None` for zero dates and anything else chrono cannot represent.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_micro_opt(
                self.hour as u32,
                self.minute as u32,
                self.second as u32,
                self.microsecond,
            )
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

impl Serialize for DateTimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decodes a TIME2 cell.
///
/// The integer part is 3 bytes: sign bit (set for non-negative values), one
/// reserved bit, 10 bits of hours, 6 of minutes, 6 of seconds. Integer and
/// fraction together form one offset-binary number, so negative values are
/// recovered by negating the combined value before splitting it.
pub fn decode_time2<B: Buf>(buf: &mut B, precision: u8) -> Result<TimeValue> {
    let frac_len = fraction_len(precision)?;
    let int_part = read_uint_be(buf, 3)? as i64;
    let fraction = read_fraction(buf, frac_len)? as i64;

    let shift = 8 * frac_len as u32;
    let packed = ((int_part - TIME_INT_OFFSET) << shift) + fraction;
    let negative = packed < 0;
    let magnitude = packed.unsigned_abs();

    let hms = magnitude >> shift;
    let fraction = magnitude & ((1u64 << shift) - 1);

    Ok(TimeValue {
        negative,
        hours: ((hms >> 12) & 0x3ff) as u16,
        minutes: ((hms >> 6) & 0x3f) as u8,
        seconds: (hms & 0x3f) as u8,
        microseconds: fraction_to_micros(fraction, frac_len),
    })
}

/// Decodes a DATETIME2 cell.
///
/// 5 bytes: sign bit, 17 bits of `year * 13 + month`, then 5 bits day, 5 bits
/// hour, 6 bits minute, 6 bits second.
pub fn decode_datetime2<B: Buf>(buf: &mut B, precision: u8) -> Result<DateTimeValue> {
    let frac_len = fraction_len(precision)?;
    let raw = read_uint_be(buf, 5)?;
    let fraction = read_fraction(buf, frac_len)?;

    let value = raw & !DATETIME_INT_OFFSET;
    let year_month = (value >> 22) & 0x1_ffff;

    Ok(DateTimeValue {
        year: (year_month / 13) as u16,
        month: (year_month % 13) as u8,
        day: ((value >> 17) & 0x1f) as u8,
        hour: ((value >> 12) & 0x1f) as u8,
        minute: ((value >> 6) & 0x3f) as u8,
        second: (value & 0x3f) as u8,
        microsecond: fraction_to_micros(fraction, frac_len),
    })
}

/// Decodes a TIMESTAMP2 cell into its UTC calendar value.
///
/// 4 bytes of big-endian unix seconds. Zero seconds is the zero timestamp.
pub fn decode_timestamp2<B: Buf>(buf: &mut B, precision: u8) -> Result<DateTimeValue> {
    let frac_len = fraction_len(precision)?;
    let seconds = read_uint_be(buf, 4)? as i64;
    let micros = fraction_to_micros(read_fraction(buf, frac_len)?, frac_len);

    if seconds == 0 && micros == 0 {
        return Ok(DateTimeValue::zero());
    }

    let utc = DateTime::from_timestamp(seconds, micros * 1_000).ok_or_else(|| {
        Error::InvalidMessage {
            message: format!("Timestamp out of range: {}", seconds),
        }
    })?;
    Ok(DateTimeValue::from_naive(utc.naive_utc()))
}
