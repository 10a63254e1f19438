use serde::Serialize;
use std::io::Write;

use super::envelope::{ChangeEvent, SchemaChangeEvent};
use crate::Result;

/// Writes change events as JSON, one object per line.
pub struct JsonSerializer<W: Write> {
    writer: W,
    pretty: bool,
    written: u64,
}

impl<W: Write> JsonSerializer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
            written: 0,
        }
    }

    /// Pretty-printed output spans several lines per event.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn write_change(&mut self, event: &ChangeEvent) -> Result<()> {
        self.write_value(event)
    }

    pub fn write_schema(&mut self, event: &SchemaChangeEvent) -> Result<()> {
        self.write_value(event)
    }

    fn write_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, value)?;
        } else {
            serde_json::to_writer(&mut self.writer, value)?;
        }
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
