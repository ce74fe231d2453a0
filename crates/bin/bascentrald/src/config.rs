//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `bascentral.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use bascentral_adapter_btleplug::BtleplugConfig;
use bascentral_app::central::CentralConfig;
use bascentral_app::input::ReadTrigger;
use bascentral_domain::connection::SecurityLevel;
use bascentral_domain::gatt::ServiceId;
use bascentral_domain::scan::ScanFilterSet;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advertisement filter.
    pub scan: ScanConfig,
    /// Link settings.
    pub connection: ConnectionConfig,
    /// Read trigger.
    pub input: InputConfig,
    /// How events are printed.
    pub output: OutputConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target service: a 16-bit, 32-bit or full 128-bit UUID.
    pub service: String,
    /// Send scan requests to advertisers.
    pub active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Security level requested once connected.
    pub security: SecurityLevel,
    /// Give up on a connect attempt after this many seconds.
    pub connect_timeout_secs: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 1-based index of the button that triggers a battery read.
    pub read_button: u8,
}

/// Rendering of printed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Events buffered for the printer before the oldest are dropped.
    pub queue_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `bascentral.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("bascentral.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("BASCENTRAL_SERVICE") {
            self.scan.service = val;
        }
        if let Some(val) = var("BASCENTRAL_OUTPUT") {
            match val.as_str() {
                "text" => self.output.format = OutputFormat::Text,
                "json" => self.output.format = OutputFormat::Json,
                _ => {}
            }
        }
        if let Some(val) = var("BASCENTRAL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.service()?;
        ReadTrigger::for_button(self.input.read_button)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        if self.connection.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.output.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The target service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when `scan.service` is not a UUID.
    pub fn service(&self) -> Result<ServiceId, ConfigError> {
        self.scan.service.parse().map_err(|_| {
            ConfigError::Validation(format!("invalid service UUID {:?}", self.scan.service))
        })
    }

    /// Settings for the central.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an invalid service or button.
    pub fn central(&self) -> Result<CentralConfig, ConfigError> {
        let mut filter = ScanFilterSet::new(self.service()?);
        if !self.scan.active {
            filter = filter.passive();
        }
        let trigger = ReadTrigger::for_button(self.input.read_button)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(CentralConfig {
            filter,
            security: self.connection.security,
            trigger,
        })
    }

    /// Settings for the btleplug adapter.
    #[must_use]
    pub fn btleplug(&self) -> BtleplugConfig {
        BtleplugConfig {
            connect_timeout_secs: self.connection.connect_timeout_secs,
            ..BtleplugConfig::default()
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            service: "180f".to_string(),
            active: true,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            security: SecurityLevel::Medium,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { read_button: 1 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            queue_capacity: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "bascentrald=info,bascentral=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
