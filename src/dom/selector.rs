//! Selector generation and matching.
//!
//! The engine speaks a deliberately small selector grammar: `#id`, and
//! child-combinator chains of `tag.class1.class2:nth-child(n)` compounds,
//! exactly what [`SelectorGenerator`] emits. Selectors are resolved fresh
//! against the current document on every apply; nothing is cached across
//! sessions.

use crate::config::EngineOptions;
use crate::dom::document::Document;
use crate::dom::node::NodeId;

/// One compound of the selector grammar
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CompoundSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    nth_child: Option<usize>,
}

/// Parse a selector string into a child-combinator chain of compounds
pub(crate) fn parse_selector(input: &str) -> Option<Vec<CompoundSelector>> {
    let chain: Option<Vec<_>> = input.split('>').map(|part| parse_compound(part.trim())).collect();
    chain.filter(|c| !c.is_empty())
}

fn parse_compound(input: &str) -> Option<CompoundSelector> {
    if input.is_empty() {
        return None;
    }
    let bytes = input.as_bytes();
    let mut compound = CompoundSelector::default();
    let mut pos = 0;

    let tag_end = bytes
        .iter()
        .position(|b| matches!(b, b'#' | b'.' | b':'))
        .unwrap_or(bytes.len());
    if tag_end > 0 {
        let tag = &input[..tag_end];
        if tag != "*" && !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
        compound.tag = Some(tag.to_ascii_lowercase());
        pos = tag_end;
    }

    while pos < bytes.len() {
        match bytes[pos] {
            b'#' => {
                let (name, next) = read_name(input, pos + 1)?;
                compound.id = Some(name);
                pos = next;
            }
            b'.' => {
                let (name, next) = read_name(input, pos + 1)?;
                compound.classes.push(name);
                pos = next;
            }
            b':' => {
                let rest = &input[pos..];
                let args = rest.strip_prefix(":nth-child(")?;
                let close = args.find(')')?;
                let n: usize = args[..close].trim().parse().ok()?;
                compound.nth_child = Some(n);
                pos += ":nth-child(".len() + close + 1;
            }
            _ => return None,
        }
    }

    if compound == CompoundSelector::default() {
        return None;
    }
    Some(compound)
}

fn read_name(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || matches!(bytes[end], b'-' | b'_')) {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some((input[start..end].to_string(), end))
}

/// Check whether an element matches a parsed selector chain
pub(crate) fn matches(doc: &Document, node: NodeId, chain: &[CompoundSelector]) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !matches_compound(doc, node, last) {
        return false;
    }
    let mut current = node;
    for compound in ancestors.iter().rev() {
        let Some(parent) = doc.parent(current) else {
            return false;
        };
        if !matches_compound(doc, parent, compound) {
            return false;
        }
        current = parent;
    }
    true
}

fn matches_compound(doc: &Document, id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(element) = doc.element(id) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if tag != "*" && element.tag_name != *tag {
            return false;
        }
    }
    if let Some(want) = &compound.id {
        if element.id() != Some(want.as_str()) {
            return false;
        }
    }
    if compound.classes.iter().any(|class| !element.has_class(class)) {
        return false;
    }
    if let Some(n) = compound.nth_child {
        if doc.element_index(id) != Some(n) {
            return false;
        }
    }
    true
}

/// Generates selectors stable enough to survive reload and minor markup drift.
///
/// A page-author id wins outright. Otherwise the generator walks from the
/// element up to (but excluding) the body, emitting per level the tag name,
/// any non-engine classes, and a `:nth-child(n)` disambiguator when the
/// element shares its tag with a sibling. Worst case is a long but still
/// unique selector; there is no failure state.
pub struct SelectorGenerator<'a> {
    options: &'a EngineOptions,
}

impl<'a> SelectorGenerator<'a> {
    /// Create a generator using the engine's reserved UI namespace
    pub fn new(options: &'a EngineOptions) -> Self {
        Self { options }
    }

    /// Produce a selector uniquely identifying `node` in the document
    pub fn generate(&self, doc: &Document, node: NodeId) -> String {
        if let Some(element) = doc.element(node) {
            if let Some(id) = element.id() {
                // ids under the engine's namespace are tool-generated, not page-author-stable
                if !id.is_empty() && !id.starts_with(&self.options.ui_prefix) {
                    return format!("#{}", id);
                }
            }
        }

        if node == doc.root() {
            return doc.tag_name(node).unwrap_or("body").to_string();
        }

        let mut segments = Vec::new();
        let mut current = node;
        while current != doc.root() {
            segments.push(self.segment(doc, current));
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        segments.join(" > ")
    }

    fn segment(&self, doc: &Document, id: NodeId) -> String {
        let Some(element) = doc.element(id) else {
            return String::new();
        };
        let mut segment = element.tag_name.clone();
        for class in element.classes() {
            if !class.starts_with(&self.options.ui_prefix) {
                segment.push('.');
                segment.push_str(class);
            }
        }
        if doc.same_tag_sibling_count(id) > 1 {
            if let Some(n) = doc.element_index(id) {
                segment.push_str(&format!(":nth-child({})", n));
            }
        }
        segment
    }
}

/// Whether an element belongs to the editor's own injected UI.
///
/// True when the element or any ancestor carries an engine-namespaced id,
/// is the editor root container or engine stylesheet, or is the drag clone.
/// Consulted by every pointer-driven operation, not just selector
/// generation: such elements are never selectable and never drop targets.
pub fn is_editor_owned(doc: &Document, node: NodeId, options: &EngineOptions) -> bool {
    let clone_class = options.drag_clone_class();
    let mut current = Some(node);
    while let Some(id) = current {
        if let Some(element) = doc.element(id) {
            if let Some(element_id) = element.id() {
                if element_id == options.editor_root_id
                    || element_id == options.style_element_id
                    || element_id.starts_with(&options.ui_prefix)
                {
                    return true;
                }
            }
            if element.has_class(&clone_class) {
                return true;
            }
        }
        current = doc.parent(id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn test_id_fast_path() {
        let doc = Document::from_html("<div><button id=\"save\">Save</button></div>");
        let div = doc.children(doc.root())[0];
        let button = doc.children(div)[0];

        let opts = options();
        assert_eq!(SelectorGenerator::new(&opts).generate(&doc, button), "#save");
    }

    #[test]
    fn test_engine_id_not_used() {
        let doc = Document::from_html("<div id=\"domedit-thing\">x</div>");
        let div = doc.children(doc.root())[0];

        let opts = options();
        assert_eq!(SelectorGenerator::new(&opts).generate(&doc, div), "div");
    }

    #[test]
    fn test_sibling_buttons_get_distinct_unique_selectors() {
        let doc = Document::from_html(
            "<div><button class=\"btn-primary\">A</button>\
             <button class=\"btn-primary\">B</button>\
             <button class=\"btn-primary\">C</button></div>",
        );
        let div = doc.children(doc.root())[0];
        let buttons: Vec<_> = doc.children(div).to_vec();

        let opts = options();
        let generator = SelectorGenerator::new(&opts);
        let selectors: Vec<_> = buttons.iter().map(|b| generator.generate(&doc, *b)).collect();

        assert_eq!(selectors.len(), 3);
        for (i, selector) in selectors.iter().enumerate() {
            for (j, other) in selectors.iter().enumerate() {
                if i != j {
                    assert_ne!(selector, other);
                }
            }
            // each selector resolves back to exactly the element it was made from
            assert_eq!(doc.select_unique(selector).unwrap(), buttons[i]);
        }
    }

    #[test]
    fn test_nested_path_round_trip() {
        let doc = Document::from_html(
            "<section class=\"hero\"><div><p>one</p><p class=\"lead\">two</p></div></section>",
        );
        let section = doc.children(doc.root())[0];
        let div = doc.children(section)[0];
        let second_p = doc.children(div)[1];

        let opts = options();
        let selector = SelectorGenerator::new(&opts).generate(&doc, second_p);
        assert_eq!(selector, "section.hero > div > p.lead:nth-child(2)");
        assert_eq!(doc.select_unique(&selector).unwrap(), second_p);
    }

    #[test]
    fn test_engine_classes_filtered_from_segments() {
        let doc = Document::from_html("<div class=\"card domedit-drop-target\">x</div>");
        let div = doc.children(doc.root())[0];

        let opts = options();
        assert_eq!(SelectorGenerator::new(&opts).generate(&doc, div), "div.card");
    }

    #[test]
    fn test_parse_selector_rejects_garbage() {
        assert!(parse_selector("").is_none());
        assert!(parse_selector("div >").is_none());
        assert!(parse_selector("div[role]").is_none());
        assert!(parse_selector("p:nth-child(x)").is_none());
    }

    #[test]
    fn test_nth_child_counts_all_element_siblings() {
        // the span is the 2nd element child even though it is the 1st span
        let doc = Document::from_html("<div><p>a</p><span>b</span></div>");
        let div = doc.children(doc.root())[0];
        let span = doc.children(div)[1];

        let chain = parse_selector("span:nth-child(2)").unwrap();
        assert!(matches(&doc, span, &chain));
        let chain = parse_selector("span:nth-child(1)").unwrap();
        assert!(!matches(&doc, span, &chain));
    }

    #[test]
    fn test_is_editor_owned() {
        let doc = Document::from_html(
            "<div id=\"domedit-root\"><button>tool</button></div><div id=\"app\"><button>page</button></div>",
        );
        let opts = options();
        let editor = doc.children(doc.root())[0];
        let editor_button = doc.children(editor)[0];
        let app = doc.children(doc.root())[1];
        let app_button = doc.children(app)[0];

        assert!(is_editor_owned(&doc, editor, &opts));
        assert!(is_editor_owned(&doc, editor_button, &opts));
        assert!(!is_editor_owned(&doc, app, &opts));
        assert!(!is_editor_owned(&doc, app_button, &opts));
    }

    #[test]
    fn test_highlight_class_does_not_make_page_element_editor_owned() {
        let doc = Document::from_html("<div class=\"domedit-drop-target\">x</div>");
        let opts = options();
        let div = doc.children(doc.root())[0];
        assert!(!is_editor_owned(&doc, div, &opts));
    }
}
