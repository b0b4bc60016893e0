//! Change model and application.
//!
//! This module provides:
//! - ChangeRecord / ChangeSet: the typed, serializable edit operations
//! - ChangeApplier: applies records to a document and can take them back
//! - StyleRegistry: the engine-owned stylesheet behind `styleRules`
//! - ScriptHost: the embedder seam that executes `javascript` records

pub mod applier;
pub mod record;
pub mod script;
pub mod stylesheet;

pub use applier::{AppliedChange, ApplyReport, ChangeApplier, SkippedChange};
pub use record::{ChangeOp, ChangeRecord, ChangeSet, ElementSpec, InsertPosition, PseudoState};
pub use script::{NoopScriptHost, ScriptHost};
pub use stylesheet::{RuleHandle, StyleRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_export() {
        let set = ChangeSet::new("v1");
        assert!(set.is_empty());
    }

    #[test]
    fn test_record_export() {
        let record = ChangeRecord::new("#a", ChangeOp::Remove);
        assert_eq!(record.op.kind(), "remove");
    }
}
