//! Error types for the Orchestrator
//!
//! Only malformed input fails a request. Every other condition (semantic
//! call failures, rejected values, exhausted recovery) degrades to a null
//! field with a source tag.

use docsift_domain::SchemaError;
use thiserror::Error;

/// Errors that reject a whole request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Label is blank
    #[error("Label must not be empty")]
    EmptyLabel,

    /// Schema is empty or malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// Neither text nor table rows to read
    #[error("Document is empty")]
    EmptyDocument,

    /// Text exceeds maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// Configuration or request options are unusable
    #[error("Configuration error: {0}")]
    Config(String),
}
