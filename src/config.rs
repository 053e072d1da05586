use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::adaptive::Verbosity;
use crate::serialization::SerializationMode;

/// Settings for the helper layer, grouped by concern
#[derive(Debug, Clone, Deserialize)]
pub struct AutokitConfig {
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub versions: VersionConfig,
    #[serde(default)]
    pub serialization: SerializationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Batch size the adaptive wrappers start from
    #[serde(default = "default_initial_batch_size")]
    pub initial_batch_size: usize,
    /// Verbosity forwarded to evaluate/predict (0, 1 or 2)
    #[serde(default = "default_verbose")]
    pub verbose: u8,
}

fn default_initial_batch_size() -> usize {
    32
}

fn default_verbose() -> u8 {
    1
}

impl BatchConfig {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_level(self.verbose)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: default_initial_batch_size(),
            verbose: default_verbose(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionConfig {
    /// Minimum supported deep-learning framework version
    #[serde(default = "default_framework_min")]
    pub framework_min: String,
    /// Minimum supported tuner version
    #[serde(default = "default_tuner_min")]
    pub tuner_min: String,
}

fn default_framework_min() -> String {
    crate::version::FRAMEWORK_MIN_VERSION.to_string()
}

fn default_tuner_min() -> String {
    crate::version::TUNER_MIN_VERSION.to_string()
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            framework_min: default_framework_min(),
            tuner_min: default_tuner_min(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SerializationConfig {
    /// Which object-serialization layout to emit and accept
    #[serde(default)]
    pub mode: SerializationMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Level for the `autokit` target when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit one JSON object per event
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AutokitConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            versions: VersionConfig::default(),
            serialization: SerializationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AutokitConfig {
    /// Load from `./config` plus `AUTOKIT_*` environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layering: defaults, `default.toml`, the `$AUTOKIT_ENV` file, then env vars
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Self::defaults()?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // e.g. config/ci.toml when AUTOKIT_ENV=ci
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AUTOKIT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (AUTOKIT_BATCH__INITIAL_BATCH_SIZE, etc.)
            .add_source(
                Environment::with_prefix("AUTOKIT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Bottom layer with a default for every key of every section
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("batch.initial_batch_size", default_initial_batch_size() as i64)?
            .set_default("batch.verbose", i64::from(default_verbose()))?
            .set_default("versions.framework_min", default_framework_min())?
            .set_default("versions.tuner_min", default_tuner_min())?
            .set_default("serialization.mode", SerializationMode::default().as_str())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AutokitConfig::default();
        assert_eq!(config.batch.initial_batch_size, 32);
        assert_eq!(config.batch.verbosity(), Verbosity::ProgressBar);
        assert_eq!(config.versions.framework_min, "2.7.0");
        assert_eq!(config.versions.tuner_min, "1.1.0");
        assert_eq!(config.serialization.mode, SerializationMode::Current);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[batch]
initial_batch_size = 128

[serialization]
mode = "legacy"

[versions]
framework_min = "2.10.0"
"#,
        )
        .unwrap();

        let config = AutokitConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.batch.initial_batch_size, 128);
        assert_eq!(config.batch.verbose, 1);
        assert_eq!(config.serialization.mode, SerializationMode::Legacy);
        assert_eq!(config.versions.framework_min, "2.10.0");
        assert_eq!(config.versions.tuner_min, "1.1.0");
    }

    #[test]
    fn test_default_layer_covers_every_section() {
        let layer = AutokitConfig::defaults().unwrap().build().unwrap();
        assert_eq!(layer.get_int("batch.initial_batch_size").unwrap(), 32);
        assert_eq!(layer.get_int("batch.verbose").unwrap(), 1);
        assert_eq!(layer.get_string("versions.framework_min").unwrap(), "2.7.0");
        assert_eq!(layer.get_string("versions.tuner_min").unwrap(), "1.1.0");
        assert_eq!(layer.get_string("serialization.mode").unwrap(), "current");
        assert_eq!(layer.get_string("logging.level").unwrap(), "info");
        assert!(!layer.get_bool("logging.json").unwrap());

        let config: AutokitConfig = layer.try_deserialize().unwrap();
        assert_eq!(config.serialization.mode, SerializationMode::Current);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutokitConfig::load_from(dir.path().join("absent")).unwrap();
        assert_eq!(config.batch.initial_batch_size, 32);
        assert_eq!(config.serialization.mode, SerializationMode::Current);
    }
}
