use crate::changes::applier::{ApplyReport, ChangeApplier};
use crate::changes::record::ChangeSet;
use crate::changes::script::ScriptHost;
use crate::config::EngineOptions;
use crate::dom::document::Document;

/// Owns the single active preview: a temporarily applied change set.
///
/// Switching to a different variant and turning the preview off share one
/// code path: whatever is currently previewed is fully reverted before
/// anything new is applied, so an old variant's mutations can never linger
/// after a switch. The coordinator owns its applier (and with it the undo
/// state), making "at most one active preview" a construction-time
/// guarantee rather than a convention.
pub struct PreviewCoordinator {
    applier: ChangeApplier,
    active: Option<String>,
}

impl PreviewCoordinator {
    /// Create a coordinator with no active preview
    pub fn new(options: EngineOptions) -> Self {
        Self { applier: ChangeApplier::new(options), active: None }
    }

    /// Builder method: set the host that executes `javascript` records
    pub fn with_script_host(mut self, host: impl ScriptHost + 'static) -> Self {
        self.applier = self.applier.with_script_host(host);
        self
    }

    /// The variant currently previewed, if any
    pub fn active_variant(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Preview a variant's change set, or clear the preview with `None`.
    ///
    /// The previous preview (if any) is reverted first; then the enabled
    /// records of the new set are applied in list order.
    pub fn set_preview(
        &mut self,
        doc: &mut Document,
        variant: &str,
        set: Option<&ChangeSet>,
    ) -> ApplyReport {
        let reverted = self.applier.revert_applied(doc);
        if !reverted.is_clean() {
            log::warn!(
                "preview switch left {} revert(s) unresolved",
                reverted.skipped.len()
            );
        }
        self.active = None;

        let Some(set) = set else {
            return reverted;
        };

        let mut report = self.applier.apply_set(doc, set);
        self.active = Some(variant.to_string());

        let mut skipped = reverted.skipped;
        skipped.extend(report.skipped);
        report.skipped = skipped;
        report
    }

    /// Revert and deactivate the current preview, if any
    pub fn clear(&mut self, doc: &mut Document) -> ApplyReport {
        let report = self.applier.revert_applied(doc);
        self.active = None;
        report
    }
}
