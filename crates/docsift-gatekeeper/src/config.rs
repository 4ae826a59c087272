//! Gatekeeper configuration

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};

/// Configuration for validation rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Enable per-category format checks (ids, email, phone, date, ...)
    pub validate_formats: bool,

    /// Enable closed-set membership when a description enumerates values
    pub validate_enums: bool,

    /// Verify CPF/CNPJ check digits, not just their layout
    pub verify_checksums: bool,

    /// Rewrite accepted ids and postal codes into their canonical layout
    pub normalize_values: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_formats: true,
            validate_enums: true,
            verify_checksums: false,
            normalize_values: true,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (only blank values are rejected)
    pub fn permissive() -> Self {
        Self {
            validate_formats: false,
            validate_enums: false,
            verify_checksums: false,
            normalize_values: false,
        }
    }

    /// Create a strict configuration (all validations enabled)
    pub fn strict() -> Self {
        Self {
            validate_formats: true,
            validate_enums: true,
            verify_checksums: true,
            normalize_values: true,
        }
    }

    /// Check that the flags are consistent
    ///
    /// # Errors
    /// Returns error if checksums are requested with format checks disabled
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.verify_checksums && !self.validate_formats {
            return Err(GatekeeperError::Config(
                "verify_checksums requires validate_formats".to_string(),
            ));
        }
        Ok(())
    }
}
