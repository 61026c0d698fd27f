//! Configuration loading and priority resolution
//!
//! Settings come from, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not fatal: compiled defaults are used and the
//! returned [`ConfigSource`] carries the warning to log. A TOML file that
//! exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "VOCPREP_CONFIG";

/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV_VAR: &str = "VOCPREP_LOG";

/// Log levels accepted by `[logging] level` and `--log_level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level TOML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Frame shift in milliseconds shared by label expansion and vocoder analysis
    pub frame_shift_ms: f64,
    pub logging: LoggingConfig,
    pub label: LabelConfig,
    pub vocoder: VocoderConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            frame_shift_ms: 5.0,
            logging: LoggingConfig::default(),
            label: LabelConfig::default(),
            vocoder: VocoderConfig::default(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error` (default: info)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[label]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Label files are state-level aligned (default: false, phone-level)
    pub state_level: bool,

    /// Emitting states per phone in state-level alignments (default: 5)
    pub states_per_phone: usize,

    /// HTS question file used for binarization
    pub question_file: Option<PathBuf>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            state_level: false,
            states_per_phone: 5,
            question_file: None,
        }
    }
}

/// `[vocoder]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocoderConfig {
    /// Resample waveforms to this rate before analysis (default: keep file rate)
    pub sample_rate: Option<u32>,

    /// FFT length for spectral analysis (default: 1024)
    pub fft_size: usize,

    /// Mel-cepstrum order; `mgc_order + 1` coefficients per frame (default: 59)
    pub mgc_order: usize,

    /// All-pass constant for frequency warping (default: derived from sample rate)
    pub alpha: Option<f64>,

    /// Lowest f0 searched, Hz (default: 70)
    pub f0_floor: f64,

    /// Highest f0 searched, Hz (default: 500)
    pub f0_ceil: f64,

    /// Normalised autocorrelation peak required to call a frame voiced (default: 0.45)
    pub voicing_threshold: f64,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            fft_size: 1024,
            mgc_order: 59,
            alpha: None,
            f0_floor: 70.0,
            f0_ceil: 500.0,
            voicing_threshold: 0.45,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_shift_ms > 0.0) {
            return Err(Error::Config(format!(
                "frame_shift_ms must be positive, got {}",
                self.frame_shift_ms
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "Unknown log level '{}' (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if self.label.states_per_phone == 0 {
            return Err(Error::Config("label.states_per_phone must be at least 1".to_string()));
        }

        let vocoder = &self.vocoder;
        if vocoder.fft_size < 64 || !vocoder.fft_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "vocoder.fft_size must be a power of two >= 64, got {}",
                vocoder.fft_size
            )));
        }
        if vocoder.mgc_order == 0 || vocoder.mgc_order >= vocoder.fft_size / 2 {
            return Err(Error::Config(format!(
                "vocoder.mgc_order must be in 1..{}, got {}",
                vocoder.fft_size / 2,
                vocoder.mgc_order
            )));
        }
        if let Some(alpha) = vocoder.alpha {
            if alpha.abs() >= 1.0 {
                return Err(Error::Config(format!(
                    "vocoder.alpha must satisfy |alpha| < 1, got {}",
                    alpha
                )));
            }
        }
        if !(vocoder.f0_floor > 0.0 && vocoder.f0_floor < vocoder.f0_ceil) {
            return Err(Error::Config(format!(
                "vocoder f0 range is invalid: floor {} ceil {}",
                vocoder.f0_floor, vocoder.f0_ceil
            )));
        }
        if !(0.0..=1.0).contains(&vocoder.voicing_threshold) {
            return Err(Error::Config(format!(
                "vocoder.voicing_threshold must be in [0, 1], got {}",
                vocoder.voicing_threshold
            )));
        }
        if vocoder.sample_rate == Some(0) {
            return Err(Error::Config("vocoder.sample_rate must be positive".to_string()));
        }

        Ok(())
    }
}

/// Resolve which config file to read
///
/// Priority: command-line argument, then `VOCPREP_CONFIG`, then the
/// per-user default (`~/.config/vocprep/config.toml`) when it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Per-user default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vocprep").join("config.toml"))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// This file was requested but does not exist; compiled defaults used
    Missing(PathBuf),
    /// No file requested and no per-user default present
    Defaults,
}

impl ConfigSource {
    /// Log where settings came from
    ///
    /// Loading happens before the subscriber exists, so the binary calls
    /// this once logging is initialized.
    pub fn report(&self) {
        match self {
            Self::File(path) => info!("Configuration: {}", path.display()),
            Self::Missing(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            Self::Defaults => info!("Configuration: compiled defaults"),
        }
    }
}

/// Load configuration, falling back to defaults when no file exists
///
/// Values are not validated here: command-line overrides are applied on
/// top first, then the caller runs [`TomlConfig::validate`] once.
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = TomlConfig::load(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}

/// Resolve the log level: CLI, then `VOCPREP_LOG`, then TOML
pub fn resolve_log_level(cli_arg: Option<&str>, logging: &LoggingConfig) -> String {
    if let Some(level) = cli_arg {
        return level.to_lowercase();
    }

    if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
        if !level.trim().is_empty() {
            return level.trim().to_lowercase();
        }
    }

    logging.level.clone()
}
