// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::{Path, PathBuf};
use config::{Config, ConfigError, Environment, File};

use crate::engine::DEFAULT_MAX_NEW_TOKENS;

/// Configuration for the compute target
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Target name: CPU, GPU or NPU
    pub target: String,
}

/// Configuration for generation calls
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationSettings {
    /// Maximum number of tokens to generate beyond the prompt
    pub max_new_tokens: usize,
}

/// Configuration for in-memory decryption of model files
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DecryptionConfig {
    /// Hex-encoded XOR key; files are read as plain data when absent
    #[serde(default)]
    pub xor_key: Option<String>,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Optional log directory; logs go to stderr when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Compute target settings
    pub device: DeviceConfig,
    /// Generation settings
    pub generation: GenerationSettings,
    /// Decryption settings
    #[serde(default)]
    pub decryption: DecryptionConfig,
    /// Logging-related settings
    pub logging: LoggingConfig,
}

impl Settings {
    /// Loads settings using the `config` directory under the current directory.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("Failed to get current directory: {}", e)))?
            .join("config");
        Self::load_from(&config_dir)
    }

    /// Creates a Settings instance by layering, from lowest to highest precedence:
    /// 1. Built-in defaults
    /// 2. `default.toml` in `config_dir`, if present
    /// 3. `local.toml` in `config_dir`, if present
    /// 4. Environment variables prefixed with ENCLM_ (nested keys joined by `__`)
    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(config_dir, environment())
    }

    fn load_with_env(config_dir: &Path, env: Environment) -> Result<Self, ConfigError> {
        let default_config = config_dir.join("default.toml");
        let local_config = config_dir.join("local.toml");

        // Convert paths to strings and keep them alive
        let default_config_path = default_config.to_string_lossy();
        let local_config_path = local_config.to_string_lossy();

        let settings = Config::builder()
            .set_default("device.target", "CPU")?
            .set_default("generation.max_new_tokens", DEFAULT_MAX_NEW_TOKENS as i64)?
            .set_default("logging.level", "warn")?
            .add_source(File::with_name(&default_config_path).required(false))
            .add_source(File::with_name(&local_config_path).required(false))
            .add_source(env)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.device.target.trim().is_empty() {
            return Err(ConfigError::Message("device.target must not be empty".to_string()));
        }

        if self.generation.max_new_tokens == 0 {
            return Err(ConfigError::Message(
                "max_new_tokens must be greater than 0".to_string()
            ));
        }

        if let Some(key) = &self.decryption.xor_key {
            if key.trim().is_empty() {
                return Err(ConfigError::Message("decryption.xor_key is set but empty".to_string()));
            }
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                self.logging.level
            ))),
        }?;

        // Create log directory if configured and doesn't exist
        if let Some(log_dir) = &self.logging.file {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create log directory at {}: {}",
                        log_dir.display(), e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

/// ENCLM_* variables, kept as strings so keys like "0012" survive intact.
/// Numeric settings still deserialize from their string form.
fn environment() -> Environment {
    Environment::with_prefix("ENCLM").prefix_separator("_").separator("__")
}
