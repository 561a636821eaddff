//! Engine configuration baked in from `engine.json`.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Auto-level measurement window.
    pub auto_level_seconds: f32,
    /// Seed for the auto-level RMS sums.
    pub rms_epsilon: f32,
    /// Slots in the audio-to-editor change queue.
    pub change_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_level_seconds: 2.0,
            rms_epsilon: 1e-6,
            change_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).context("engine config is not valid JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.auto_level_seconds.is_finite() && self.auto_level_seconds > 0.0,
            "auto_level_seconds must be positive, got {}",
            self.auto_level_seconds
        );
        ensure!(
            self.rms_epsilon.is_finite() && self.rms_epsilon > 0.0,
            "rms_epsilon must be positive, got {}",
            self.rms_epsilon
        );
        ensure!(
            self.change_queue_capacity > 0,
            "change_queue_capacity must be at least 1"
        );
        Ok(())
    }

    /// Load the baked-in config. Non-fatal: falls back to defaults.
    pub fn load() -> Self {
        match Self::from_json(include_str!("../engine.json")) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("falling back to default engine config: {err:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baked_in_config_parses() {
        let config = EngineConfig::from_json(include_str!("../engine.json")).unwrap();
        assert!(config.auto_level_seconds > 0.0);
        assert_eq!(EngineConfig::load(), config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = EngineConfig::from_json(r#"{"auto_level_seconds": 0.5}"#).unwrap();
        assert_eq!(config.auto_level_seconds, 0.5);
        assert_eq!(config.change_queue_capacity, 64);
    }

    #[test]
    fn test_rejects_non_positive_window() {
        assert!(EngineConfig::from_json(r#"{"auto_level_seconds": 0.0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"auto_level_seconds": -1.0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"change_queue_capacity": 0}"#).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(EngineConfig::from_json("{ not json").is_err());
    }
}
