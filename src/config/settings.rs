//! Application settings

use super::ConfigError;
use crate::core::controller::{Channels, DEFAULT_DRAIN_LIMIT};
use crate::core::history::DEFAULT_WINDOW;
use crate::core::logger::LogFormat;
use crate::core::simulator::SimulatorConfig;
use crate::core::transport::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Controller connection
    pub connection: ConnectionConfig,
    /// Monitor loop
    pub monitor: MonitorConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Pump-down model for the simulated peer
    pub simulator: SimulatorConfig,
}

impl AppConfig {
    /// Load config from the default location; a missing file yields defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Load config from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = super::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection
            .serial_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(1..=2).contains(&self.monitor.gauge) {
            return Err(ConfigError::Invalid(format!(
                "monitor.gauge must be 1 or 2, got {}",
                self.monitor.gauge
            )));
        }
        if self.monitor.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "monitor.interval_ms must be greater than zero".to_string(),
            ));
        }
        let sim = &self.simulator;
        for (name, value) in [
            ("floor", sim.floor),
            ("amplitude", sim.amplitude),
            ("decay_rate", sim.decay_rate),
            ("noise", sim.noise),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "simulator.{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if sim.noise > sim.amplitude {
            return Err(ConfigError::Invalid(format!(
                "simulator.noise ({}) must not exceed simulator.amplitude ({})",
                sim.noise, sim.amplitude
            )));
        }
        Ok(())
    }
}

/// Controller connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port: String,
    /// Baud rate (9600, 19200 or 38400)
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Single (TPG 261) or dual (TPG 262) channel controller
    pub channels: Channels,
    /// Max bytes discarded while clearing the buffer in the loopback test
    pub drain_limit: usize,
    /// Use the simulated peer instead of the serial port
    pub simulate: bool,
    /// Use the simulated peer when the port cannot be opened
    pub fallback_to_simulator: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            channels: Channels::Dual,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            simulate: false,
            fallback_to_simulator: true,
        }
    }
}

impl ConnectionConfig {
    /// Serial settings for the transport
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Monitor loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds
    pub interval_ms: u64,
    /// Gauge polled by the monitor
    pub gauge: u8,
    /// Samples kept in the rolling window
    pub window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            gauge: 1,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write diagnostics to a rolling file in `directory`
    pub enabled: bool,
    /// Log directory
    pub directory: Option<PathBuf>,
    /// Format for sample logs
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: super::log_dir(),
            format: LogFormat::Text,
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.baud_rate, 9600);
        assert_eq!(config.connection.channels, Channels::Dual);
        assert_eq!(config.monitor.window, 600);
        assert!(config.connection.fallback_to_simulator);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [connection]
            port = "COM3"
            channels = "single"

            [simulator]
            floor = 1e-7
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.port, "COM3");
        assert_eq!(config.connection.channels, Channels::Single);
        assert_eq!(config.connection.timeout_ms, 1000);
        assert!((config.simulator.floor - 1e-7).abs() < 1e-20);
        assert!((config.simulator.decay_rate - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.connection.baud_rate = 4800;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.monitor.gauge = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_unusable_simulator() {
        let config: AppConfig = toml::from_str("[simulator]\nnoise = 1e308\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        for (floor, amplitude, decay_rate, noise) in [
            (f64::NAN, 1e-6, 0.15, 1e-9),
            (5e-8, f64::INFINITY, 0.15, 1e-9),
            (5e-8, 1e-6, f64::INFINITY, 1e-9),
            (5e-8, 1e-6, 0.15, -1e-9),
            (5e-8, 1e-6, 0.15, 2e-6),
        ] {
            let mut config = AppConfig::default();
            config.simulator = SimulatorConfig {
                floor,
                amplitude,
                decay_rate,
                noise,
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }

        let mut config = AppConfig::default();
        config.simulator.noise = config.simulator.amplitude;
        assert!(config.validate().is_ok());
    }
}
