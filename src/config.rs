//! Engine configuration
//!
//! Fixed settings the processor reads once at instantiation. Every field has
//! a default, so a partial JSON document only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NeuralFxError, Result};

/// File name looked up inside the bundle directory
pub const DEFAULT_MODEL_FILE_NAME: &str = "model.json";

/// Number of zero samples run through the model before real audio
pub const DEFAULT_PREROLL_SAMPLES: usize = 2048;

/// DC blocker cutoff in Hz
pub const DEFAULT_DC_CUTOFF_HZ: f32 = 35.0;

/// What the active path outputs when no model could be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloadedPolicy {
    /// Zero-fill the output buffer
    #[default]
    Silence,
    /// Copy the input buffer unchanged
    Passthrough,
}

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model document name, relative to the bundle path
    pub model_file_name: String,
    /// Warm-up length driven through the model after reset
    pub preroll_samples: usize,
    /// High-pass cutoff of the post filter
    pub dc_cutoff_hz: f32,
    /// Output of the active path while unloaded
    pub unloaded_policy: UnloadedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_file_name: DEFAULT_MODEL_FILE_NAME.to_string(),
            preroll_samples: DEFAULT_PREROLL_SAMPLES,
            dc_cutoff_hz: DEFAULT_DC_CUTOFF_HZ,
            unloaded_policy: UnloadedPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Read a configuration from a JSON file and validate it
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NeuralFxError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.model_file_name.trim().is_empty() {
            return Err(NeuralFxError::InvalidConfig {
                reason: "model_file_name must not be empty".to_string(),
            });
        }

        if !self.dc_cutoff_hz.is_finite() || self.dc_cutoff_hz <= 0.0 {
            return Err(NeuralFxError::InvalidConfig {
                reason: format!(
                    "dc_cutoff_hz must be a positive frequency, got {}",
                    self.dc_cutoff_hz
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.model_file_name, "model.json");
        assert_eq!(config.preroll_samples, 2048);
        assert_eq!(config.dc_cutoff_hz, 35.0);
        assert_eq!(config.unloaded_policy, UnloadedPolicy::Silence);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "unloaded_policy": "passthrough" }"#).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                unloaded_policy: UnloadedPolicy::Passthrough,
                ..EngineConfig::default()
            }
        );
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "model_file_name": "amp.json", "preroll_samples": 64 }"#)
            .unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.model_file_name, "amp.json");
        assert_eq!(config.preroll_samples, 64);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_path(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_rejects_bad_cutoff() {
        let config = EngineConfig {
            dc_cutoff_hz: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
