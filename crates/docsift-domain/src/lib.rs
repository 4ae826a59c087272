//! docsift Domain Layer
//!
//! Core data model for field resolution. It defines what a request asks for,
//! what the pipeline answers with, and the boundary trait towards the
//! semantic extraction collaborator. No pattern matching, storage or I/O
//! lives here.
//!
//! ## Key Concepts
//!
//! - **Schema**: ordered field name → description mapping, names unique
//! - **FieldCandidate**: a proposed value plus its source and confidence
//! - **Confidence**: a structural-quality score, always within [0, 1]
//! - **ExtractionResult**: the cacheable answer, one candidate per field
//! - **PipelineState**: the orchestrator's lifecycle states

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod confidence;
pub mod field;
pub mod pipeline;
pub mod request;
pub mod result;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use confidence::Confidence;
pub use field::{FieldCandidate, FieldSource, RejectionReason, ValidationStatus};
pub use pipeline::PipelineState;
pub use request::{ExtractionOptions, ExtractionRequest, TableRow};
pub use result::{ExtractionResponse, ExtractionResult, PipelineMetadata, Usage};
pub use schema::{FieldSpec, Schema, SchemaError};
