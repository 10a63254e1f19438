use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Change events go to stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub include_schema_events: bool,
    #[serde(default)]
    pub pretty: bool,
}

/// What to do when an event body fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicationConfig {
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default)]
    pub checkpoint_file: Option<PathBuf>,
    #[serde(default = "default_checkpoint_interval_events")]
    pub checkpoint_interval_events: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::default(),
            checkpoint_file: None,
            checkpoint_interval_events: default_checkpoint_interval_events(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BINLOG_CAPTURE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Defaults for decoding `path` when no configuration file is given.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: SourceConfig {
                path: path.as_ref().to_path_buf(),
                verify_checksums: default_verify_checksums(),
            },
            output: OutputConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }

    /// File name reported in change event sources.
    pub fn source_file_name(&self) -> String {
        self.source
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.path.display().to_string())
    }
}

fn default_verify_checksums() -> bool {
    true
}

fn default_checkpoint_interval_events() -> u64 {
    1000
}
