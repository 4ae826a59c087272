//! Pipeline lifecycle states
//!
//! ```text
//! Init → CacheCheck → Done                                   (cache hit)
//!                   → Heuristics → Partition → SemanticBatch → Validate
//!                     → Partition2 → Recovery → Merge → Learn → CacheStore → Done
//! Init | CacheCheck → Error                                  (malformed input)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A state of one request's pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Request received, not yet validated
    Init,
    /// Looking up the result cache
    CacheCheck,
    /// Per-field strict pattern pass
    Heuristics,
    /// Split into resolved and unresolved fields
    Partition,
    /// One batched semantic call over unresolved fields
    SemanticBatch,
    /// Structural validation of batch values
    Validate,
    /// Split into accepted and needs-recovery fields
    Partition2,
    /// Concurrent per-field fallback
    Recovery,
    /// Assemble the final candidate per field
    Merge,
    /// Commit point: schema learner update
    Learn,
    /// Commit point: cache write
    CacheStore,
    /// Success terminal
    Done,
    /// Input rejected; nothing written
    Error,
}

impl PipelineState {
    /// Name used as the stage key in timings
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::CacheCheck => "cache_check",
            PipelineState::Heuristics => "heuristics",
            PipelineState::Partition => "partition",
            PipelineState::SemanticBatch => "semantic_batch",
            PipelineState::Validate => "validate",
            PipelineState::Partition2 => "partition2",
            PipelineState::Recovery => "recovery",
            PipelineState::Merge => "merge",
            PipelineState::Learn => "learn",
            PipelineState::CacheStore => "cache_store",
            PipelineState::Done => "done",
            PipelineState::Error => "error",
        }
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Init, CacheCheck)
                | (Init, Error)
                | (CacheCheck, Done)
                | (CacheCheck, Heuristics)
                | (CacheCheck, Error)
                | (Heuristics, Partition)
                | (Partition, SemanticBatch)
                | (SemanticBatch, Validate)
                | (Validate, Partition2)
                | (Partition2, Recovery)
                | (Recovery, Merge)
                | (Merge, Learn)
                | (Learn, CacheStore)
                | (CacheStore, Done)
        )
    }

    /// Whether the state ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Error)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_full_miss_path_is_legal() {
        let path = [
            Init,
            CacheCheck,
            Heuristics,
            Partition,
            SemanticBatch,
            Validate,
            Partition2,
            Recovery,
            Merge,
            Learn,
            CacheStore,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_error_only_from_early_states() {
        assert!(Init.can_transition_to(Error));
        assert!(CacheCheck.can_transition_to(Error));
        assert!(!Heuristics.can_transition_to(Error));
        assert!(!Recovery.can_transition_to(Error));
    }

    #[test]
    fn test_commit_point_after_merge() {
        assert!(!Recovery.can_transition_to(Learn));
        assert!(!Heuristics.can_transition_to(CacheStore));
        assert!(Merge.can_transition_to(Learn));
    }

    #[test]
    fn test_terminals() {
        assert!(Done.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Merge.is_terminal());
    }
}
