//! docsift Gatekeeper
//!
//! Structural validation and confidence scoring for candidate field values.
//!
//! The Gatekeeper provides:
//! - Format checks per pattern category (ids, emails, phones, dates, ...)
//! - Optional CPF/CNPJ checksum verification
//! - Closed-set membership for enumerated descriptions
//! - Value normalization (`12345678900` → `123.456.789-00`)
//! - Confidence scoring and the escalation policy
//!
//! It never judges whether a value is true, only whether it is well formed.
//!
//! # Examples
//!
//! ```
//! use docsift_gatekeeper::{Gatekeeper, ValidationConfig, Verdict};
//!
//! let gatekeeper = Gatekeeper::new(ValidationConfig::default());
//! let verdict = gatekeeper.validate("cpf", Some("12345678900"), "documento CPF");
//! assert_eq!(verdict, Verdict::Accepted(Some("123.456.789-00".to_string())));
//! ```

#![warn(missing_docs)]

mod config;
mod confidence;
mod error;
mod validator;

pub use config::ValidationConfig;
pub use confidence::ConfidenceScorer;
pub use error::GatekeeperError;
pub use validator::{Gatekeeper, Verdict};
