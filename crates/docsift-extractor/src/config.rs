//! Configuration for the Orchestrator

use crate::ExtractorError;
use docsift_domain::ExtractionOptions;
use docsift_gatekeeper::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum characters of context sent in one semantic call
    pub context_budget_chars: usize,

    /// Bytes kept on each side of a keyword hit when cutting context windows
    pub context_window_radius: usize,

    /// Window radius multiplier for the recovery call's context
    pub recovery_context_multiplier: usize,

    /// Maximum per-field recovery tasks running at once
    pub max_recovery_fanout: usize,

    /// Wall-clock cap for one field's recovery phase (milliseconds)
    pub field_timeout_ms: u64,

    /// Maximum input text length (characters)
    pub max_document_chars: usize,

    /// Results held by the cache
    pub cache_capacity: usize,

    /// Label profiles held by the schema learner
    pub max_labels: usize,

    /// Learned examples are cut to this many characters
    pub max_example_len: usize,

    /// Fields tracked per label profile
    pub max_fields_per_label: usize,

    /// Documents above this size are hashed off the async workers (bytes)
    pub offload_threshold_bytes: usize,

    /// Value validation rules
    pub validation: ValidationConfig,
}

impl ExtractorConfig {
    /// Get the recovery timeout as a Duration
    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    /// Request options matching this configuration
    pub fn default_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            context_budget: self.context_budget_chars,
            max_recovery_fanout: self.max_recovery_fanout,
            field_timeout: self.field_timeout(),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if a bound is zero or the validation flags conflict
    pub fn validate(&self) -> Result<(), ExtractorError> {
        let non_zero = [
            ("context_budget_chars", self.context_budget_chars),
            ("context_window_radius", self.context_window_radius),
            ("recovery_context_multiplier", self.recovery_context_multiplier),
            ("max_recovery_fanout", self.max_recovery_fanout),
            ("max_document_chars", self.max_document_chars),
            ("cache_capacity", self.cache_capacity),
            ("max_labels", self.max_labels),
            ("max_example_len", self.max_example_len),
            ("max_fields_per_label", self.max_fields_per_label),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ExtractorError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.field_timeout_ms == 0 {
            return Err(ExtractorError::Config(
                "field_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.context_budget_chars > self.max_document_chars {
            return Err(ExtractorError::Config(
                "context_budget_chars cannot exceed max_document_chars".to_string(),
            ));
        }
        self.validation
            .validate()
            .map_err(|e| ExtractorError::Config(e.to_string()))
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            context_budget_chars: 2_500,
            context_window_radius: 240,
            recovery_context_multiplier: 2,
            max_recovery_fanout: 8,
            field_timeout_ms: 20_000,
            max_document_chars: 1_000_000,
            cache_capacity: 256,
            max_labels: 100,
            max_example_len: 64,
            max_fields_per_label: 50,
            offload_threshold_bytes: 256 * 1024,
            validation: ValidationConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: small prompts, short recovery, strict validation
    pub fn aggressive() -> Self {
        Self {
            context_budget_chars: 1_200,
            context_window_radius: 120,
            recovery_context_multiplier: 2,
            max_recovery_fanout: 4,
            field_timeout_ms: 8_000,
            max_document_chars: 250_000,
            validation: ValidationConfig::strict(),
            ..Self::default()
        }
    }

    /// Lenient preset: wide context, patient recovery, larger stores
    pub fn lenient() -> Self {
        Self {
            context_budget_chars: 6_000,
            context_window_radius: 400,
            recovery_context_multiplier: 3,
            max_recovery_fanout: 16,
            field_timeout_ms: 60_000,
            max_document_chars: 5_000_000,
            cache_capacity: 1_024,
            max_labels: 500,
            max_example_len: 128,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    ///
    /// # Errors
    /// Returns error if the TOML is malformed
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_aggressive_config_is_valid() {
        let config = ExtractorConfig::aggressive();
        assert!(config.validate().is_ok());
        assert!(config.validation.verify_checksums);
    }

    #[test]
    fn test_lenient_config_is_valid() {
        let config = ExtractorConfig::lenient();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let mut config = ExtractorConfig::default();
        config.max_labels = 0;
        assert!(matches!(config.validate(), Err(ExtractorError::Config(_))));

        let mut config = ExtractorConfig::default();
        config.field_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_cannot_exceed_document_limit() {
        let mut config = ExtractorConfig::default();
        config.context_budget_chars = config.max_document_chars + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_conflicting_validation_flags_rejected() {
        let mut config = ExtractorConfig::default();
        config.validation.validate_formats = false;
        config.validation.verify_checksums = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_options() {
        let options = ExtractorConfig::default().default_options();
        assert_eq!(options, ExtractionOptions::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml(
            "field_timeout_ms = 500\n\n[validation]\nverify_checksums = true\n",
        )
        .unwrap();
        assert_eq!(parsed.field_timeout(), Duration::from_millis(500));
        assert!(parsed.validation.verify_checksums);
        assert!(parsed.validation.validate_formats);
        assert_eq!(parsed.cache_capacity, 256);
    }
}
