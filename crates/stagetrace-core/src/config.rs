//! Configuration loading and typed config structures for the debugger host.
//!
//! Configuration is read from a YAML file (by default
//! `stagetrace-config.yaml`). Every section and field has a default, so an
//! empty document is a valid configuration.

use std::path::Path;

use serde::Deserialize;
use stagetrace_types::BreakpointSpec;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level debugger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DebuggerConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Stage tree behavior.
    #[serde(default)]
    pub debugger: DebuggerSettings,

    /// Host simulation loop parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Breakpoints to install at startup.
    #[serde(default)]
    pub breakpoints: Vec<BreakpointSpec>,
}

impl DebuggerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// What the scoped execution wrapper does with a failure inside stage work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkErrorPolicy {
    /// Log the failure with the active stack, pop the stage, carry on.
    #[default]
    Suppress,
    /// Pop the stage, then return the failure to the caller.
    Propagate,
}

/// Stage tree behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DebuggerSettings {
    /// Whether breakpoints and controller stepping are active. Stages are
    /// tracked either way.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Failure handling inside scoped stage work.
    #[serde(default)]
    pub work_errors: WorkErrorPolicy,
}

impl Default for DebuggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            work_errors: WorkErrorPolicy::default(),
        }
    }
}

/// Host simulation loop parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Maximum number of ticks before the host stops (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Request a step-into before the first tick so the host starts paused.
    #[serde(default)]
    pub pause_on_start: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: 0,
            tick_interval_ms: default_tick_interval_ms(),
            pause_on_start: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stagetrace_types::{BlockPos, BreakpointId};

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DebuggerConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.debugger.enabled);
        assert_eq!(config.debugger.work_errors, WorkErrorPolicy::Suppress);
        assert_eq!(config.simulation.tick_interval_ms, 50);
        assert!(config.breakpoints.is_empty());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
logging:
  level: debug

debugger:
  enabled: false
  work_errors: propagate

simulation:
  max_ticks: 20
  tick_interval_ms: 250
  pause_on_start: true

breakpoints:
  - id: 1
    kind: block_updated
    pos: { x: 0, y: 64, z: 0 }
  - id: 2
    kind: block_update
    enabled: false
    world: nether
";

        let config = DebuggerConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(!config.debugger.enabled);
        assert_eq!(config.debugger.work_errors, WorkErrorPolicy::Propagate);
        assert_eq!(config.simulation.max_ticks, 20);
        assert!(config.simulation.pause_on_start);
        assert_eq!(config.breakpoints.len(), 2);

        let first = config.breakpoints.first();
        assert_eq!(first.map(|b| b.id), Some(BreakpointId(1)));
        assert_eq!(first.and_then(|b| b.pos), Some(BlockPos::new(0, 64, 0)));
        assert_eq!(first.map(|b| b.enabled), Some(true));

        let second = config.breakpoints.get(1);
        assert_eq!(second.map(|b| b.enabled), Some(false));
        assert_eq!(second.and_then(|b| b.world.as_deref()), Some("nether"));
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = DebuggerConfig::parse("simulation:\n  max_ticks: 3\n").unwrap();

        assert_eq!(config.simulation.max_ticks, 3);
        // Everything else uses defaults
        assert_eq!(config.simulation.tick_interval_ms, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        let config = DebuggerConfig::parse("");
        assert_eq!(config.ok(), Some(DebuggerConfig::default()));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let config = DebuggerConfig::parse("debugger:\n  work_errors: explode\n");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let config = DebuggerConfig::from_file(Path::new("/nonexistent/stagetrace.yaml"));
        assert!(matches!(config, Err(ConfigError::Io { .. })));
    }
}
