use crate::changes::record::PseudoState;
use crate::config::EngineOptions;
use crate::dom::document::Document;
use crate::dom::node::NodeId;
use indexmap::IndexMap;
use std::fmt::Write;

/// Handle to the rules a single `styleRules` record owns.
///
/// Reverting removes exactly the rules behind the handle, never the whole
/// stylesheet, so records styling the same element stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleHandle(u64);

/// Registry backing `styleRules` records with a dedicated `<style>` element.
///
/// Pseudo-state styling cannot be expressed inline, so each record's
/// per-state declaration maps are rendered as rule blocks keyed by the
/// element's selector. The registry owns its style element exclusively and
/// rewrites its full text on every mutation.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    style_element_id: String,
    rules: IndexMap<u64, RuleBlock>,
    next_handle: u64,
}

#[derive(Debug, Clone)]
struct RuleBlock {
    selector: String,
    states: IndexMap<PseudoState, IndexMap<String, String>>,
    important: bool,
}

impl StyleRegistry {
    /// Create a registry owning the options' style element id
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            style_element_id: options.style_element_id.clone(),
            rules: IndexMap::new(),
            next_handle: 0,
        }
    }

    /// Register a record's rule blocks and write them into the document
    pub fn insert(
        &mut self,
        doc: &mut Document,
        selector: &str,
        states: &IndexMap<PseudoState, IndexMap<String, String>>,
        important: bool,
    ) -> RuleHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.rules.insert(
            handle,
            RuleBlock { selector: selector.to_string(), states: states.clone(), important },
        );
        self.sync(doc);
        RuleHandle(handle)
    }

    /// Remove the rules behind a handle and rewrite the stylesheet
    pub fn remove(&mut self, doc: &mut Document, handle: RuleHandle) -> bool {
        let removed = self.rules.shift_remove(&handle.0).is_some();
        if removed {
            self.sync(doc);
        }
        removed
    }

    /// Number of registered rule blocks
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Render the full stylesheet text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in self.rules.values() {
            for (state, declarations) in &block.states {
                if declarations.is_empty() {
                    continue;
                }
                write!(out, "{}{} {{ ", block.selector, state.suffix()).ok();
                for (property, value) in declarations {
                    let bang = if block.important { " !important" } else { "" };
                    write!(out, "{}: {}{}; ", property, value, bang).ok();
                }
                out.push_str("}\n");
            }
        }
        out
    }

    /// The engine-owned `<style>` element, created on first use
    pub fn style_element(&self, doc: &mut Document) -> NodeId {
        let existing = doc
            .all_elements()
            .into_iter()
            .find(|id| doc.element(*id).and_then(|e| e.id()) == Some(self.style_element_id.as_str()));
        if let Some(id) = existing {
            return id;
        }
        let style = doc.create_element("style");
        if let Some(element) = doc.element_mut(style) {
            element.set_attribute("id", self.style_element_id.clone());
        }
        let root = doc.root();
        let _ = doc.append_child(root, style);
        style
    }

    fn sync(&self, doc: &mut Document) {
        let element = self.style_element(doc);
        let _ = doc.set_text_content(element, &self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover_states(value: &str) -> IndexMap<PseudoState, IndexMap<String, String>> {
        IndexMap::from([(
            PseudoState::Hover,
            IndexMap::from([("background".to_string(), value.to_string())]),
        )])
    }

    #[test]
    fn test_insert_writes_style_element() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        registry.insert(&mut doc, "#cta", &hover_states("red"), true);

        let style = doc.select_unique("#domedit-styles").unwrap();
        assert_eq!(doc.tag_name(style), Some("style"));
        assert_eq!(
            doc.text_content(style),
            "#cta:hover { background: red !important; }\n"
        );
    }

    #[test]
    fn test_important_false() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        registry.insert(&mut doc, ".a", &hover_states("blue"), false);
        assert_eq!(registry.render(), ".a:hover { background: blue; }\n");
    }

    #[test]
    fn test_normal_state_has_no_suffix() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        let states = IndexMap::from([(
            PseudoState::Normal,
            IndexMap::from([("color".to_string(), "green".to_string())]),
        )]);
        registry.insert(&mut doc, "p.lead", &states, true);
        assert_eq!(registry.render(), "p.lead { color: green !important; }\n");
    }

    #[test]
    fn test_empty_states_render_nothing() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        let states = IndexMap::from([(PseudoState::Hover, IndexMap::new())]);
        registry.insert(&mut doc, "#x", &states, true);
        assert_eq!(registry.render(), "");
    }

    #[test]
    fn test_remove_only_touches_owned_rules() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        let first = registry.insert(&mut doc, "#one", &hover_states("red"), true);
        let second = registry.insert(&mut doc, "#two", &hover_states("blue"), true);

        assert!(registry.remove(&mut doc, first));
        let style = doc.select_unique("#domedit-styles").unwrap();
        let text = doc.text_content(style);
        assert!(!text.contains("#one"));
        assert!(text.contains("#two"));

        assert!(registry.remove(&mut doc, second));
        assert!(!registry.remove(&mut doc, second));
        assert!(registry.is_empty());
        assert_eq!(doc.text_content(style), "");
    }

    #[test]
    fn test_style_element_reused() {
        let mut doc = Document::new();
        let mut registry = StyleRegistry::new(&EngineOptions::default());

        registry.insert(&mut doc, "#a", &hover_states("red"), true);
        registry.insert(&mut doc, "#b", &hover_states("blue"), true);

        assert_eq!(doc.select_all("style").len(), 1);
    }
}
