//! docsift Extractor
//!
//! Resolves the named fields of a document, cheapest reliable strategy
//! first.
//!
//! # Architecture
//!
//! ```text
//! Request → cache → heuristics → semantic batch → Gatekeeper → recovery → merge
//!                                                                          ↓
//!                                               ResultCache ← SchemaLearner
//! ```
//!
//! # Key Features
//!
//! - **Heuristic pass**: strict category patterns and enumerated options
//! - **Bounded context**: keyword windows cut to a character budget
//! - **One batched call**: every unresolved field goes in a single semantic call
//! - **Concurrent recovery**: per-field race of relaxed patterns, learned
//!   templates and one combined semantic call, under a timeout
//! - **Commit point**: the learner and cache are only written once the result
//!   is complete
//!
//! # Example Usage
//!
//! ```
//! use docsift_domain::{ExtractionRequest, FieldSource, Schema};
//! use docsift_extractor::{ExtractorConfig, Orchestrator};
//! use docsift_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let orchestrator =
//!     Orchestrator::from_config(MockProvider::new(), ExtractorConfig::default()).unwrap();
//!
//! let schema = Schema::from_pairs([("cpf", "documento CPF")]).unwrap();
//! let request = ExtractionRequest::new("id-card", schema, "CPF: 123.456.789-00");
//! let response = orchestrator.extract(request).await.unwrap();
//!
//! assert_eq!(response.result.value("cpf"), Some("123.456.789-00"));
//! assert_eq!(response.result.get("cpf").unwrap().source, FieldSource::Heuristic);
//! assert_eq!(response.metadata.semantic_calls, 0);
//! # });
//! ```

#![warn(missing_docs)]

mod adapter;
mod config;
mod context;
mod error;
mod heuristics;
mod orchestrator;
mod recovery;

pub use adapter::{hinted_fields, BatchOutcome, SemanticAdapter};
pub use config::ExtractorConfig;
pub use context::{ContextBuilder, WINDOW_SEPARATOR};
pub use error::ExtractorError;
pub use heuristics::{corpus, resolve, HeuristicOutcome};
pub use orchestrator::Orchestrator;
pub use recovery::{
    relaxed_search, template_pattern, template_search, RecoveryEngine, RecoveryInput,
    RecoveryReport,
};
