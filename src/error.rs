use thiserror::Error;

/// Errors produced while applying or reverting change records.
///
/// None of these abort processing of the remaining records in a change set:
/// partial application is the expected degraded mode, and set-level entry
/// points collect these into an [`ApplyReport`](crate::changes::ApplyReport)
/// instead of propagating them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// The record's selector did not resolve to exactly one element.
    #[error("selector {selector:?} matched {matched} element(s), expected exactly one")]
    SelectorMiss { selector: String, matched: usize },

    /// A move or drop would relocate an element into its own subtree.
    #[error("invalid structural target: {0}")]
    InvalidStructuralTarget(String),

    /// Unexpected document state during a mutation (e.g. a detached node).
    #[error("apply failed: {0}")]
    ApplyFailed(String),
}

impl EditError {
    /// Build a `SelectorMiss` for the given selector and match count.
    pub fn selector_miss(selector: impl Into<String>, matched: usize) -> Self {
        Self::SelectorMiss { selector: selector.into(), matched }
    }
}

/// Result type alias for domedit operations
pub type Result<T> = std::result::Result<T, EditError>;
