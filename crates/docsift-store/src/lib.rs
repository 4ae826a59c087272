//! docsift Storage Layer
//!
//! Process-lifetime, in-memory stores shared by concurrent requests:
//!
//! - [`ResultCache`]: request fingerprint → complete [`ExtractionResult`],
//!   bounded with LRU eviction
//! - [`SchemaLearner`]: per-label memory of which source resolved each field
//!   and a truncated example value, bounded in labels, fields and example
//!   length
//!
//! Both are internally synchronized and meant to be shared behind an `Arc`.
//! Nothing here survives the process.
//!
//! [`ExtractionResult`]: docsift_domain::ExtractionResult
//!
//! # Examples
//!
//! ```
//! use docsift_store::{CacheKey, ResultCache};
//! use docsift_domain::Schema;
//!
//! let schema = Schema::from_pairs([("cpf", "documento CPF")]).unwrap();
//! let key = CacheKey::derive("id-card", "CPF: 123.456.789-00", &[], &schema);
//! let cache = ResultCache::new(16).unwrap();
//! assert!(cache.get(&key).is_none());
//! ```

#![warn(missing_docs)]

pub mod cache;
mod error;
pub mod learner;

pub use cache::{CacheKey, ResultCache};
pub use error::StoreError;
pub use learner::{LabelProfile, LearnedField, SchemaLearner};
