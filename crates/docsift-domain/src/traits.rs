//! Trait definitions for external interactions
//!
//! The semantic extraction model is a collaborator: the core only defines
//! what it sends and what it expects back. Implementations live in
//! `docsift-llm`.

use crate::{FieldSpec, TableRow, Usage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;

/// One batched semantic extraction call
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticRequest {
    /// Bounded context excerpt of the document
    pub context: String,

    /// Document-type identifier
    pub label: String,

    /// Fields to resolve; descriptions may carry learned example hints
    pub fields: Vec<FieldSpec>,

    /// Table rows extracted alongside the text
    pub tables: Vec<TableRow>,
}

impl SemanticRequest {
    /// Names of the requested fields, in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// What the collaborator answered
///
/// Fields missing from `values` are treated as null by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticResponse {
    /// Field → value (or explicit null)
    pub values: HashMap<String, Option<String>>,

    /// Token usage of the call
    pub usage: Usage,
}

/// Trait for the semantic extraction collaborator
///
/// Implemented by the infrastructure layer (docsift-llm). One call to
/// `extract` is one external invocation; retries are the caller's business.
#[async_trait]
pub trait SemanticExtractor: Send + Sync {
    /// Error type for transport or parse failures
    type Error: Display + Send;

    /// Resolve `request.fields` from `request.context`
    async fn extract(&self, request: &SemanticRequest) -> Result<SemanticResponse, Self::Error>;
}
