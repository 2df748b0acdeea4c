//! Machine and host configuration.
//!
//! Loaded from an optional JSON file; command line flags override it.

use crate::cpu::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_HEIGHT, MAX_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default host step cadence, in steps per second.
pub const DEFAULT_HZ: u32 = 60;

/// Configuration for a machine and the host loop that drives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Framebuffer width in pixels.
    pub width: usize,
    /// Framebuffer height in pixels.
    pub height: usize,
    /// Seed for the machine's random generator; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Steps per second when running in real time.
    pub hz: u32,
    /// Stop the host loop at the first unknown opcode.
    pub halt_on_unknown: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: None,
            hz: DEFAULT_HZ,
            halt_on_unknown: false,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Check that the values describe a usable machine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "framebuffer must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_WIDTH || self.height > MAX_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "framebuffer must be at most {}x{}, got {}x{}",
                MAX_WIDTH, MAX_HEIGHT, self.width, self.height
            )));
        }
        if self.hz == 0 {
            return Err(ConfigError::Invalid("hz must be at least 1".into()));
        }
        Ok(())
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!((config.width, config.height), (64, 32));
        assert_eq!(config.seed, None);
        assert_eq!(config.hz, 60);
        assert!(!config.halt_on_unknown);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MachineConfig::from_json(r#"{ "seed": 7, "hz": 500 }"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.hz, 500);
        assert_eq!(config.width, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            MachineConfig::from_json(r#"{ "width": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MachineConfig::from_json(r#"{ "hz": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        assert!(matches!(
            MachineConfig::from_json(r#"{ "width": 9223372036854775807, "height": 4 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MachineConfig::from_json(r#"{ "height": 257 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(MachineConfig::from_json(r#"{ "width": 256, "height": 256 }"#).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            MachineConfig::from_json("{ seed: "),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MachineConfig::load("/nonexistent/chip8.json"),
            Err(ConfigError::IoError(_))
        ));
    }
}
