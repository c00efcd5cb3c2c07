//! Configuration management for sedmcp
//!
//! sedmcp stores configuration in ~/.sedmcp/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::RegexLimits;

const MIB: usize = 1024 * 1024;

/// sedmcp configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Regex compilation settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// JSON-RPC server limits
    #[serde(default)]
    pub server: ServerConfig,

    /// Terminal output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write a debug log file instead of stderr warnings
    #[serde(default)]
    pub debug: bool,

    /// Level for the sedmcp target: error, warn, info, debug or trace
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for the log file (default: ~/.sedmcp)
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: default_level(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum compiled regex size in MB
    #[serde(default = "default_regex_size_limit_mb")]
    pub regex_size_limit_mb: usize,

    /// Maximum lazy DFA cache size in MB
    #[serde(default = "default_dfa_size_limit_mb")]
    pub dfa_size_limit_mb: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regex_size_limit_mb: default_regex_size_limit_mb(),
            dfa_size_limit_mb: default_dfa_size_limit_mb(),
        }
    }
}

impl EngineConfig {
    pub fn limits(&self) -> RegexLimits {
        RegexLimits {
            size_limit: self.regex_size_limit_mb.saturating_mul(MIB),
            dfa_size_limit: self.dfa_size_limit_mb.saturating_mul(MIB),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Largest `content` argument accepted, in bytes
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,

    /// Longest operation list accepted by sed_execute_batch
    #[serde(default = "default_max_batch_operations")]
    pub max_batch_operations: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: default_max_content_bytes(),
            max_batch_operations: default_max_batch_operations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Colour terminal output when stdout is a terminal
    #[serde(default = "default_color")]
    pub color: bool,

    /// Unchanged lines shown around each change in previews
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            context_lines: default_context_lines(),
        }
    }
}

// Default functions for serde
fn default_level() -> String { "info".to_string() }
fn default_regex_size_limit_mb() -> usize { 10 }
fn default_dfa_size_limit_mb() -> usize { 2 }
fn default_max_content_bytes() -> usize { 10 * MIB }
fn default_max_batch_operations() -> usize { 100 }
fn default_color() -> bool { true }
fn default_context_lines() -> usize { 2 }

/// Get the sedmcp home directory (~/.sedmcp)
pub fn sedmcp_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".sedmcp"))
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(sedmcp_dir()?.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# sedmcp Configuration File
#
# Values set here apply to both `sedmcp serve` and `sedmcp apply`.

[logging]
# Write a debug log to ~/.sedmcp/sedmcp.log (default: false)
# When false, only warnings and errors are printed to stderr.
debug = false

# Log level for sedmcp: error, warn, info, debug, trace (default: info)
# RUST_LOG overrides this when set.
level = "info"

# Custom log directory (optional)
#log_dir = "/var/log/sedmcp"

[engine]
# Maximum compiled regex size in MB (default: 10)
# Patterns that compile to larger programs are rejected as invalid.
regex_size_limit_mb = 10

# Maximum lazy DFA cache per pattern in MB (default: 2)
dfa_size_limit_mb = 2

[server]
# Largest content accepted by the JSON-RPC tools, in bytes (default: 10 MiB)
max_content_bytes = 10485760

# Longest operation list accepted by sed_execute_batch (default: 100)
max_batch_operations = 100

[display]
# Colour output when writing to a terminal (default: true)
# NO_COLOR in the environment always disables colour.
color = true

# Unchanged lines shown around each change in previews (default: 2, max: 10)
context_lines = 2
"#
}

/// Save the default commented configuration file
pub fn save_default_config(config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(config_path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", config_path.display()))?;

    Ok(())
}

/// A loaded configuration and, when the file had to be restored, the reason.
///
/// Loading runs before logging is set up, so the notice is handed back for
/// the caller to log once a subscriber exists.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub restored: Option<String>,
}

/// Load configuration from ~/.sedmcp/config.toml
pub fn load_config() -> Result<LoadedConfig> {
    load_config_from(&config_file_path()?)
}

/// Load configuration from a specific file, creating default if needed
///
/// If the config file doesn't exist, creates it with defaults and returns them.
/// If the config file is malformed, recreates it with defaults.
pub fn load_config_from(config_path: &Path) -> Result<LoadedConfig> {
    if !config_path.exists() {
        save_default_config(config_path)?;
    }

    let config_str = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(e) => {
            save_default_config(config_path)?;
            return Ok(LoadedConfig {
                config: Config::default(),
                restored: Some(format!(
                    "Malformed config file {}: {}; restored defaults",
                    config_path.display(),
                    e
                )),
            });
        }
    };

    validate_config(&config)
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(LoadedConfig {
        config,
        restored: None,
    })
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    let level = config.logging.level.to_lowercase();
    if !["error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
        anyhow::bail!(
            "Invalid logging.level: {} (must be error, warn, info, debug or trace)",
            config.logging.level
        );
    }

    if config.engine.regex_size_limit_mb == 0 {
        anyhow::bail!("Invalid regex_size_limit_mb: 0 (min 1 MB)");
    }

    if config.engine.dfa_size_limit_mb == 0 {
        anyhow::bail!("Invalid dfa_size_limit_mb: 0 (min 1 MB)");
    }

    if config.server.max_content_bytes == 0 {
        anyhow::bail!("Invalid max_content_bytes: 0 (must be positive)");
    }

    if config.server.max_batch_operations == 0 {
        anyhow::bail!("Invalid max_batch_operations: 0 (must be positive)");
    }

    if config.display.context_lines > 10 {
        anyhow::bail!("Invalid context_lines: {} (max 10)", config.display.context_lines);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.logging.debug);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.regex_size_limit_mb, 10);
        assert_eq!(config.server.max_content_bytes, 10 * MIB);
        assert_eq!(config.server.max_batch_operations, 100);
        assert!(config.display.color);
        assert_eq!(config.display.context_lines, 2);
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let parsed: Config = toml::from_str(get_default_config_content()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_validate_config_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_context() {
        let mut config = Config::default();
        config.display.context_lines = 11;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_engine_limits_in_bytes() {
        let limits = EngineConfig::default().limits();
        assert_eq!(limits.size_limit, 10 * MIB);
        assert_eq!(limits.dfa_size_limit, 2 * MIB);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.config, Config::default());
        assert!(loaded.restored.is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nmax_batch_operations = 5\n").unwrap();

        let config = load_config_from(&path).unwrap().config;
        assert_eq!(config.server.max_batch_operations, 5);
        assert_eq!(config.server.max_content_bytes, 10 * MIB);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_malformed_file_restores_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.config, Config::default());
        let notice = loaded.restored.unwrap();
        assert!(notice.starts_with("Malformed config file"));
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("[engine]"));
    }

    #[test]
    fn test_load_rejects_out_of_range_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[display]\ncontext_lines = 50\n").unwrap();

        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[display]"));
    }
}
