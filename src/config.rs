use std::time::Duration;

/// Configuration for the editing engine.
///
/// All of the engine's injected markup (the drag clone, highlight classes,
/// the engine-owned stylesheet element) lives under a reserved id/class
/// namespace so the engine can tell its own UI apart from page content.
/// Elements inside that namespace are never selectable, never generate
/// selectors, and never act as drop targets.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Reserved prefix for every id/class the engine injects
    pub ui_prefix: String,

    /// Id of the editor's root container element, if the embedder mounts one.
    /// Everything nested under it is treated as editor-owned.
    pub editor_root_id: String,

    /// Id of the engine-owned `<style>` element backing `styleRules` records
    pub style_element_id: String,

    /// How long a successful drop's preview stays visible before the element
    /// is restored and the `move` record is emitted
    pub settle_delay: Duration,
}

impl EngineOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the reserved UI namespace prefix
    pub fn ui_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ui_prefix = prefix.into();
        self
    }

    /// Builder method: set the editor root container id
    pub fn editor_root_id(mut self, id: impl Into<String>) -> Self {
        self.editor_root_id = id.into();
        self
    }

    /// Builder method: set the engine stylesheet element id
    pub fn style_element_id(mut self, id: impl Into<String>) -> Self {
        self.style_element_id = id.into();
        self
    }

    /// Builder method: set the drop settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Class applied to the visual clone that follows the pointer
    pub fn drag_clone_class(&self) -> String {
        format!("{}drag-clone", self.ui_prefix)
    }

    /// Class applied to a valid candidate drop target
    pub fn drop_target_class(&self) -> String {
        format!("{}drop-target", self.ui_prefix)
    }

    /// Class applied to an invalid candidate drop target
    pub fn drop_invalid_class(&self) -> String {
        format!("{}drop-invalid", self.ui_prefix)
    }

    /// Class flagging the brief post-drop success highlight
    pub fn drop_success_class(&self) -> String {
        format!("{}drop-success", self.ui_prefix)
    }

    /// All highlight classes the engine may leave on page elements mid-drag
    pub fn highlight_classes(&self) -> [String; 3] {
        [
            self.drop_target_class(),
            self.drop_invalid_class(),
            self.drop_success_class(),
        ]
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ui_prefix: "domedit-".to_string(),
            editor_root_id: "domedit-root".to_string(),
            style_element_id: "domedit-styles".to_string(),
            settle_delay: Duration::from_millis(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert_eq!(options.ui_prefix, "domedit-");
        assert_eq!(options.editor_root_id, "domedit-root");
        assert_eq!(options.settle_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_builder() {
        let options = EngineOptions::new()
            .ui_prefix("edit-")
            .settle_delay(Duration::ZERO);

        assert_eq!(options.ui_prefix, "edit-");
        assert_eq!(options.drag_clone_class(), "edit-drag-clone");
        assert_eq!(options.settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_highlight_classes_share_prefix() {
        let options = EngineOptions::default();
        for class in options.highlight_classes() {
            assert!(class.starts_with("domedit-"));
        }
    }
}
