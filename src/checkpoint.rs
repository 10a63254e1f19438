//! Checkpoint management for resumable decoding.
//!
//! A checkpoint records the binlog file and the offset of the next event to
//! decode, so that a restarted run continues where the previous one stopped
//! instead of re-emitting every change in the file.
//!
//! # Example
//!
//! ```rust,no_run
//! use binlog_capture::checkpoint::{Checkpoint, CheckpointManager};
//!
//! fn main() -> binlog_capture::Result<()> {
//!     let manager = CheckpointManager::new("checkpoint.json");
//!
//!     if let Some(checkpoint) = manager.load()? {
//!         println!("Resuming {} at {}", checkpoint.file, checkpoint.position);
//!     }
//!
//!     let checkpoint = Checkpoint::new("mysql-bin.000001".to_string(), 4096, 100);
//!     manager.save(&checkpoint)?;
//!     Ok(())
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// A position in a binlog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Binlog file name, without directories.
    pub file: String,
    /// Offset of the next event to decode.
    pub position: u64,
    /// Events processed when this checkpoint was taken.
    pub event_count: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Checkpoint {
    /// Creates a checkpoint stamped with the current time.
    ///
    /// ```rust
    /// use binlog_capture::checkpoint::Checkpoint;
    ///
    /// let checkpoint = Checkpoint::new("mysql-bin.000001".to_string(), 4096, 100);
    /// assert_eq!(checkpoint.position, 4096);
    /// assert_eq!(checkpoint.event_count, 100);
    /// ```
    pub fn new(file: String, position: u64, event_count: u64) -> Self {
        Self {
            file,
            position,
            event_count,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Persists checkpoints to a JSON file.
///
/// Writes go to a temporary file that is synced and then renamed over the
/// checkpoint, so a crash never leaves a partially written checkpoint.
pub struct CheckpointManager {
    file_path: PathBuf,
}

impl CheckpointManager {
    pub fn new(checkpoint_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: checkpoint_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Loads the checkpoint, or `None` when no checkpoint file exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or is not a valid
    /// checkpoint.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.file_path.exists() {
            debug!("No checkpoint file found at {:?}", self.file_path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path).map_err(|e| {
            error!("Failed to read checkpoint file: {}", e);
            Error::Io(e)
        })?;

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => {
                info!(
                    "Loaded checkpoint: file={}, position={}, timestamp={}",
                    checkpoint.file, checkpoint.position, checkpoint.timestamp
                );
                Ok(Some(checkpoint))
            }
            Err(e) => {
                error!("Failed to parse checkpoint file: {}", e);
                Err(Error::Config(format!("Invalid checkpoint file: {}", e)))
            }
        }
    }

    /// Saves the checkpoint atomically.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        debug!(
            "Saving checkpoint: file={}, position={}",
            checkpoint.file, checkpoint.position
        );

        let temp_path = self.file_path.with_extension("tmp");

        let json = serde_json::to_string_pretty(checkpoint)?;
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.file_path)?;

        debug!("Checkpoint saved successfully");
        Ok(())
    }
}
