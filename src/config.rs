//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::Thresholds;

/// Errors raised while validating timing configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("time unit must be finite and positive, got {0}")]
    InvalidTimeUnit(f64),

    #[error("{name} multiple must be finite and positive, got {value}")]
    InvalidMultiple { name: &'static str, value: f64 },

    #[error("{shorter} ({shorter_units} units) must be shorter than {longer} ({longer_units} units)")]
    ThresholdOrder {
        shorter: &'static str,
        shorter_units: f64,
        longer: &'static str,
        longer_units: f64,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Morse timing, expressed as multiples of a single base time unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Length of one time unit in seconds
    pub unit_secs: f64,
    /// Dot length in units
    pub dot_units: f64,
    /// Dash length in units
    pub dash_units: f64,
    /// Release length that ends a letter, in units
    pub inter_char_units: f64,
    /// Release length that ends a word, in units
    pub word_units: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unit_secs: 0.2,
            dot_units: 1.0,
            dash_units: 3.0,
            inter_char_units: 3.0,
            word_units: 7.0,
        }
    }
}

impl TimingConfig {
    /// Default multiples with a custom time unit
    pub fn with_unit(unit_secs: f64) -> Self {
        Self {
            unit_secs,
            ..Default::default()
        }
    }

    /// Check the invariants the classifier relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unit_secs.is_finite() || self.unit_secs <= 0.0 {
            return Err(ConfigError::InvalidTimeUnit(self.unit_secs));
        }

        for (name, value) in [
            ("dot", self.dot_units),
            ("dash", self.dash_units),
            ("inter-char", self.inter_char_units),
            ("word", self.word_units),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidMultiple { name, value });
            }
        }

        if self.dot_units >= self.dash_units {
            return Err(ConfigError::ThresholdOrder {
                shorter: "dot",
                shorter_units: self.dot_units,
                longer: "dash",
                longer_units: self.dash_units,
            });
        }

        if self.inter_char_units >= self.word_units {
            return Err(ConfigError::ThresholdOrder {
                shorter: "inter-char gap",
                shorter_units: self.inter_char_units,
                longer: "word gap",
                longer_units: self.word_units,
            });
        }

        Ok(())
    }

    /// Validate and convert to absolute thresholds in seconds
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        self.validate()?;
        Ok(Thresholds {
            dot: self.dot_units * self.unit_secs,
            dash: self.dash_units * self.unit_secs,
            inter_char: self.inter_char_units * self.unit_secs,
            word: self.word_units * self.unit_secs,
        })
    }
}

/// Optional on-disk overrides, every field may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    timing: Option<TimingConfig>,
    debounce_ms: Option<u64>,
    socket_path: Option<PathBuf>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Decoder timing
    pub timing: TimingConfig,

    /// Bounce window applied by the edge listener, in milliseconds
    pub debounce_ms: u64,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from defaults, `config.json` and the environment
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("morse-decoder");

        Self::load_from(data_dir, |var| std::env::var(var).ok())
    }

    /// Load from `data_dir/config.json`, then overrides looked up via `env`
    pub fn load_from<F>(data_dir: PathBuf, env: F) -> Result<Self>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::with_data_dir(data_dir);

        let file = config.data_dir.join("config.json");
        if file.exists() {
            config.apply_file(&file)?;
        }

        config.apply_env(env)?;
        config.timing.validate()?;

        Ok(config)
    }

    /// Defaults rooted at the given data directory
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let socket_path = data_dir.join("decoder.sock");
        Self {
            timing: TimingConfig::default(),
            debounce_ms: 10,
            socket_path,
            data_dir,
        }
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: FileConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(?file, "config file loaded");

        if let Some(timing) = file.timing {
            self.timing = timing;
        }
        if let Some(debounce_ms) = file.debounce_ms {
            self.debounce_ms = debounce_ms;
        }
        if let Some(socket_path) = file.socket_path {
            self.socket_path = socket_path;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(value) = env("MORSE_TIME_UNIT") {
            self.timing.unit_secs = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "MORSE_TIME_UNIT",
                value: value.clone(),
            })?;
        }
        if let Some(value) = env("MORSE_DEBOUNCE_MS") {
            self.debounce_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "MORSE_DEBOUNCE_MS",
                value: value.clone(),
            })?;
        }
        if let Some(value) = env("MORSE_SOCKET") {
            self.socket_path = PathBuf::from(value);
        }
        Ok(())
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
