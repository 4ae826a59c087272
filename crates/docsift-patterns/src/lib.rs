//! docsift Pattern Library
//!
//! Static, compiled format patterns grouped by [`Category`], the
//! keyword → category lookup table, enumerated-value cue parsing and the
//! text normalization shared by the heuristic resolver, the validator and
//! the context builder.
//!
//! # Examples
//!
//! ```
//! use docsift_patterns::{categories_for, Category};
//!
//! let cats = categories_for("cpf", "documento CPF do titular");
//! assert!(cats.contains(&Category::Cpf));
//!
//! let found: Vec<_> = Category::Cpf
//!     .strict()
//!     .find_iter("CPF: 123.456.789-00")
//!     .map(|m| m.as_str())
//!     .collect();
//! assert_eq!(found, vec!["123.456.789-00"]);
//! ```

#![warn(missing_docs)]

pub mod category;
pub mod keywords;
pub mod normalize;

pub use category::Category;
pub use keywords::{categories_for, enum_options, ENUM_CUES};
pub use normalize::{fold_char, normalize, tokenize, NormalizedText};
