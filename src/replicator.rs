use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use tracing::{debug, error, info, warn};

use crate::binlog::{Event, EventPayload, LogStream, StreamOptions};
use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::config::ErrorPolicy;
use crate::sink::{ChangeEvent, JsonSerializer, SchemaChangeEvent, SourceMetadata};
use crate::{Config, Result};

/// Counters for one run over a binlog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub events: u64,
    pub row_events: u64,
    pub rows: u64,
    pub skipped_events: u64,
    pub failed_events: u64,
    /// Offset of the next undecoded event.
    pub last_position: u64,
}

/// Decodes the configured binlog and writes its changes as JSON lines.
pub struct Replicator {
    config: Config,
    from_start: bool,
}

impl Replicator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            from_start: false,
        }
    }

    /// Ignore any saved checkpoint.
    pub fn from_start(mut self, from_start: bool) -> Self {
        self.from_start = from_start;
        self
    }

    /// Runs to the end of the file, writing to the configured output.
    pub fn run(&mut self) -> Result<RunSummary> {
        match self.config.output.path.clone() {
            Some(path) => {
                info!("Writing change events to {}", path.display());
                self.run_with_writer(BufWriter::new(File::create(path)?))
            }
            None => self.run_with_writer(BufWriter::new(io::stdout().lock())),
        }
    }

    /// Runs to the end of the file, writing change events to `writer`.
    ///
    /// When resuming from a checkpoint the file is still decoded from the
    /// start, since rows events need the table maps that precede them, but
    /// nothing before the checkpoint position is written.
    pub fn run_with_writer<W: Write>(&mut self, writer: W) -> Result<RunSummary> {
        info!("Replicator starting");

        let options = StreamOptions {
            verify_checksums: self.config.source.verify_checksums,
        };
        let mut stream = LogStream::open_with(&self.config.source.path, options)?;
        let file_name = self.config.source_file_name();

        let checkpoints = self
            .config
            .replication
            .checkpoint_file
            .as_ref()
            .map(CheckpointManager::new);

        if let Some(manager) = &checkpoints {
            info!("Checkpointing to {}", manager.path().display());
        }

        let emit_from = match (&checkpoints, self.from_start) {
            (Some(manager), false) => match manager.load()? {
                Some(checkpoint) if checkpoint.file == file_name => {
                    info!("Resuming {} after position {}", file_name, checkpoint.position);
                    checkpoint.position
                }
                Some(checkpoint) => {
                    warn!(
                        "Ignoring checkpoint for {}, decoding {}",
                        checkpoint.file, file_name
                    );
                    0
                }
                None => 0,
            },
            _ => 0,
        };

        let mut serializer = JsonSerializer::new(writer).pretty(self.config.output.pretty);
        let mut summary = RunSummary {
            last_position: stream.position(),
            ..RunSummary::default()
        };
        let interval = self.config.replication.checkpoint_interval_events.max(1);
        let mut since_checkpoint = 0u64;

        loop {
            let event = match stream.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    let position = stream.position();
                    if self.config.replication.on_error == ErrorPolicy::Skip
                        && stream.skip_failed_event()?
                    {
                        warn!("Skipped undecodable event at {}: {}", position, e);
                        summary.failed_events += 1;
                        summary.last_position = stream.position();
                        continue;
                    }

                    error!("Failed to decode event at {}: {}", position, e);
                    serializer.flush()?;
                    if let Some(manager) = &checkpoints {
                        manager.save(&self.checkpoint(&file_name, &summary))?;
                    }
                    return Err(e);
                }
            };

            summary.events += 1;
            summary.last_position = stream.position();

            let emit = event.position >= emit_from;
            self.handle_event(&stream, event, emit, &file_name, &mut serializer, &mut summary)?;

            since_checkpoint += 1;
            if since_checkpoint >= interval {
                if let Some(manager) = &checkpoints {
                    serializer.flush()?;
                    manager.save(&self.checkpoint(&file_name, &summary))?;
                }
                since_checkpoint = 0;
            }
        }

        serializer.flush()?;
        if let Some(manager) = &checkpoints {
            manager.save(&self.checkpoint(&file_name, &summary))?;
        }

        info!(
            events = summary.events,
            row_events = summary.row_events,
            rows = summary.rows,
            written = serializer.written(),
            skipped = summary.skipped_events,
            failed = summary.failed_events,
            position = summary.last_position,
            "Replicator finished"
        );

        Ok(summary)
    }

    fn handle_event<R: Read + Seek, W: Write>(
        &self,
        stream: &LogStream<R>,
        event: Event,
        emit: bool,
        file_name: &str,
        serializer: &mut JsonSerializer<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let Event {
            header,
            position,
            payload,
        } = event;

        match payload {
            EventPayload::SchemaDefinition(definition) => {
                if emit && self.config.output.include_schema_events {
                    let source = SourceMetadata::new(
                        file_name.to_string(),
                        &header,
                        position,
                        definition.table_id,
                    );
                    serializer.write_schema(&SchemaChangeEvent::new(definition, source))?;
                }
            }
            EventPayload::RowChange(record) => {
                summary.row_events += 1;
                summary.rows += record.row_count() as u64;

                if emit {
                    // Rows events only decode after their table map is cached.
                    if let Some(schema) = stream.schema_cache().get(record.table_id) {
                        let source = SourceMetadata::new(
                            file_name.to_string(),
                            &header,
                            position,
                            record.table_id,
                        );
                        for change in ChangeEvent::from_rows(&record, schema, source) {
                            serializer.write_change(&change)?;
                        }
                    }
                }
            }
            EventPayload::Skipped => {
                debug!("Skipped event type {} at {}", header.type_code, position);
                summary.skipped_events += 1;
            }
        }

        Ok(())
    }

    fn checkpoint(&self, file_name: &str, summary: &RunSummary) -> Checkpoint {
        Checkpoint::new(file_name.to_string(), summary.last_position, summary.events)
    }
}
