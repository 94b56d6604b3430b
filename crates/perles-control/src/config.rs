//! `ControlPlaneConfig` — the ambient configuration surface (not part
//! of `spec.md`'s core, added per `SPEC_FULL.md` §2 ambient stack).
//!
//! Loaded by the embedding binary (`perles-cli`) via the same
//! "explicit path, else default file, else built-in defaults" cascade
//! the model codebase's CLI uses for its own config type.

use serde::{Deserialize, Serialize};

/// Default capacity of a process's recent-output ring buffer
/// (`spec.md` §4.1: "default 100").
pub const DEFAULT_OUTPUT_BUFFER_CAPACITY: usize = 100;

/// Default bound on a worker's message queue (`0` = unbounded).
pub const DEFAULT_QUEUE_MAX_SIZE: usize = 0;

/// Default per-subscriber channel capacity for the process-event broker.
pub const DEFAULT_BROKER_CHANNEL_CAPACITY: usize = 256;

/// Control-plane-wide configuration, deserialized from an optional
/// TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Capacity of each process's [`perles_buffer::OutputBuffer`].
    pub output_buffer_capacity: usize,
    /// Default bound applied to a worker's message queue when first
    /// created (`0` = unbounded).
    pub queue_max_size: usize,
    /// Per-subscriber channel capacity for the process-event broker.
    pub broker_channel_capacity: usize,
    /// Additional workflow registry roots to search, layered after the
    /// built-in registry and before the user registry (`~/.perles/workflows`)
    /// so a later entry shadows an earlier one with the same
    /// `(namespace, key)`.
    pub workflow_search_paths: Vec<String>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            output_buffer_capacity: DEFAULT_OUTPUT_BUFFER_CAPACITY,
            queue_max_size: DEFAULT_QUEUE_MAX_SIZE,
            broker_channel_capacity: DEFAULT_BROKER_CHANNEL_CAPACITY,
            workflow_search_paths: Vec::new(),
        }
    }
}

impl ControlPlaneConfig {
    /// Parse a config from TOML text, falling back to field-level
    /// defaults for anything the file omits (`#[serde(default)]`).
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from `path` if given, else `perles.toml` in the current
    /// directory if it exists, else built-in defaults — the cascade
    /// `SPEC_FULL.md` §2 describes.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Self {
        let path = explicit_path.map(std::path::Path::to_path_buf).unwrap_or_else(|| "perles.toml".into());
        match std::fs::read_to_string(&path) {
            Ok(text) => match Self::from_toml_str(&text) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
