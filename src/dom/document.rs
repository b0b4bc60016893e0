use crate::dom::node::{ElementData, Node, NodeKind, NodeId, BoundingBox};
use crate::dom::parse::parse_fragment;
use crate::dom::selector;
use crate::error::{EditError, Result};
use crate::changes::record::InsertPosition;
use std::fmt::Write;

/// Tags serialized without children or a closing tag
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Tags whose text content is serialized and parsed verbatim
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// An in-memory mutable document: an id-addressed node arena rooted at `<body>`.
///
/// This is the engine's stand-in for the live DOM it edits. Node ids are
/// stable and never reused; detaching a node keeps it in the arena so a
/// later revert can re-insert the exact same subtree. Every structural
/// operation re-validates attachment rather than trusting held references.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create an empty document with a `<body>` root
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(ElementData::new("body")),
        };
        Self { nodes: vec![root_node], root: NodeId(0) }
    }

    /// Create a document whose body is parsed from an HTML fragment
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        let roots = parse_fragment(&mut doc, html);
        for node in roots {
            let _ = doc.append_child(doc.root, node);
        }
        doc
    }

    /// The `<body>` root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element node
    pub fn create_element(&mut self, tag_name: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(tag_name)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    /// Parse an HTML fragment into detached nodes, returning the top-level ids
    pub fn create_fragment(&mut self, html: &str) -> Vec<NodeId> {
        parse_fragment(self, html)
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: None, children: Vec::new(), kind });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Element payload of a node, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.node(id)?.kind {
            NodeKind::Element(ref data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    /// Mutable element payload of a node, if it is an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.node_mut(id)?.kind {
            NodeKind::Element(ref mut data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    /// Text payload of a node, if it is a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id)?.kind {
            NodeKind::Text(ref text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// Tag name of an element node
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    /// Parent of a node, if attached to one
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Child ids of a node in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The sibling immediately after a node under its current parent
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|c| *c == id)?;
        siblings.get(position + 1).copied()
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `id` sits strictly inside `ancestor`'s subtree
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// 1-based position of an element among its parent's element children
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let mut index = 0;
        for child in self.children(parent) {
            if self.element(*child).is_some() {
                index += 1;
                if *child == id {
                    return Some(index);
                }
            }
        }
        None
    }

    /// How many of the parent's element children share this element's tag
    pub fn same_tag_sibling_count(&self, id: NodeId) -> usize {
        let Some(tag) = self.tag_name(id) else { return 0 };
        let Some(parent) = self.parent(id) else { return 1 };
        self.children(parent)
            .iter()
            .filter(|c| self.tag_name(**c) == Some(tag))
            .count()
    }

    /// Set the layout bounding box for an element
    pub fn set_bounding_box(&mut self, id: NodeId, bbox: BoundingBox) {
        if let Some(element) = self.element_mut(id) {
            element.bounding_box = Some(bbox);
        }
    }

    /// All attached element ids in tree order, starting at the root
    pub fn all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.element(id).is_some() {
            out.push(id);
        }
        for child in self.children(id).to_vec() {
            self.collect_elements(child, out);
        }
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert a detached node under `parent`, before `reference` (append when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        if self.element(parent).is_none() {
            return Err(EditError::ApplyFailed(format!(
                "insert parent {:?} is not an element",
                parent
            )));
        }
        if self.node(child).is_none() {
            return Err(EditError::ApplyFailed(format!("unknown node {:?}", child)));
        }
        if self.node(child).and_then(|n| n.parent).is_some() {
            return Err(EditError::ApplyFailed(format!(
                "node {:?} is already attached",
                child
            )));
        }
        let position = match reference {
            Some(reference) => {
                let siblings = self.children(parent);
                match siblings.iter().position(|c| *c == reference) {
                    Some(position) => position,
                    None => {
                        return Err(EditError::ApplyFailed(format!(
                            "reference {:?} is not a child of {:?}",
                            reference, parent
                        )));
                    }
                }
            }
            None => self.children(parent).len(),
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(position, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach a node from its parent; the node stays in the arena
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(EditError::ApplyFailed("cannot detach the document root".to_string()));
        }
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        Ok(())
    }

    /// Detach and return all children of a node, preserving order
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        for child in &children {
            if let Some(node) = self.node_mut(*child) {
                node.parent = None;
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.children.clear();
        }
        children
    }

    /// Insert a detached node relative to `target` at the given position
    pub fn insert_at(&mut self, target: NodeId, node: NodeId, position: InsertPosition) -> Result<()> {
        match position {
            InsertPosition::Before | InsertPosition::After => {
                let Some(parent) = self.parent(target) else {
                    return Err(EditError::ApplyFailed(format!(
                        "target {:?} has no parent to insert beside",
                        target
                    )));
                };
                let reference = match position {
                    InsertPosition::Before => Some(target),
                    _ => self.next_sibling(target),
                };
                self.insert_before(parent, node, reference)
            }
            InsertPosition::FirstChild => {
                let reference = self.children(target).first().copied();
                self.insert_before(target, node, reference)
            }
            InsertPosition::LastChild => self.insert_before(target, node, None),
        }
    }

    /// Relocate an attached node relative to `target`.
    ///
    /// Rejects self-targets and targets inside the moving node's subtree
    /// before any mutation happens, so a failed move leaves the tree intact.
    pub fn move_node(&mut self, node: NodeId, target: NodeId, position: InsertPosition) -> Result<()> {
        if node == target {
            return Err(EditError::InvalidStructuralTarget(
                "cannot move an element relative to itself".to_string(),
            ));
        }
        if self.is_descendant_of(target, node) {
            return Err(EditError::InvalidStructuralTarget(
                "cannot move an element into its own subtree".to_string(),
            ));
        }
        if !self.is_attached(node) {
            return Err(EditError::ApplyFailed(format!("node {:?} is detached", node)));
        }
        if !self.is_attached(target) {
            return Err(EditError::ApplyFailed(format!("target {:?} is detached", target)));
        }
        self.detach(node)?;
        self.insert_at(target, node, position)
    }

    /// Concatenated text of the node's subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for child in self.children(id).to_vec() {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Replace the node's children with a single text node.
    ///
    /// Returns the detached previous children so the caller can restore them.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<Vec<NodeId>> {
        if self.element(id).is_none() {
            return Err(EditError::ApplyFailed(format!("node {:?} is not an element", id)));
        }
        let previous = self.take_children(id);
        let text_node = self.create_text(text);
        self.append_child(id, text_node)?;
        Ok(previous)
    }

    /// Serialized markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Serialized markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Replace the node's children with a parsed HTML fragment.
    ///
    /// Returns the detached previous children so the caller can restore them.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<Vec<NodeId>> {
        if self.element(id).is_none() {
            return Err(EditError::ApplyFailed(format!("node {:?} is not an element", id)));
        }
        let fragment = parse_fragment(self, html);
        let previous = self.take_children(id);
        for node in fragment {
            self.append_child(id, node)?;
        }
        Ok(previous)
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => {
                let raw = self
                    .parent(id)
                    .and_then(|p| self.tag_name(p))
                    .map(|tag| RAW_TEXT_ELEMENTS.contains(&tag))
                    .unwrap_or(false);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Some(NodeKind::Element(element)) => {
                write!(out, "<{}", element.tag_name).ok();
                for (name, value) in &element.attributes {
                    write!(out, " {}=\"{}\"", name, escape_attr(value)).ok();
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                write!(out, "</{}>", element.tag_name).ok();
            }
            None => {}
        }
    }

    /// All attached elements matching a selector, in tree order
    pub fn select_all(&self, selector_str: &str) -> Vec<NodeId> {
        let Some(chain) = selector::parse_selector(selector_str) else {
            log::warn!("unparseable selector: {:?}", selector_str);
            return Vec::new();
        };
        self.all_elements()
            .into_iter()
            .filter(|id| selector::matches(self, *id, &chain))
            .collect()
    }

    /// The single element a selector resolves to.
    ///
    /// Zero matches, more than one match, and an unparseable selector all
    /// report as [`EditError::SelectorMiss`].
    pub fn select_unique(&self, selector_str: &str) -> Result<NodeId> {
        let matches = self.select_all(selector_str);
        match matches.as_slice() {
            [only] => Ok(*only),
            _ => Err(EditError::selector_miss(selector_str, matches.len())),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a text run for markup output
pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape an attribute value for markup output
pub(crate) fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::from_html(
            "<header><button id=\"nav-btn\">Menu</button></header>\
             <main><a href=\"/page\">Click here</a><div class=\"content\">Some text</div></main>",
        )
    }

    #[test]
    fn test_from_html_structure() {
        let doc = sample();
        let root = doc.root();
        assert_eq!(doc.tag_name(root), Some("body"));
        assert_eq!(doc.children(root).len(), 2);

        let header = doc.children(root)[0];
        assert_eq!(doc.tag_name(header), Some("header"));
        let button = doc.children(header)[0];
        assert_eq!(doc.element(button).unwrap().id(), Some("nav-btn"));
        assert_eq!(doc.text_content(button), "Menu");
    }

    #[test]
    fn test_attach_detach() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        assert!(!doc.is_attached(div));

        doc.append_child(doc.root(), div).unwrap();
        assert!(doc.is_attached(div));
        assert_eq!(doc.parent(div), Some(doc.root()));

        doc.detach(div).unwrap();
        assert!(!doc.is_attached(div));
        // still in the arena, so it can be re-inserted
        doc.append_child(doc.root(), div).unwrap();
        assert!(doc.is_attached(div));
    }

    #[test]
    fn test_detach_root_rejected() {
        let mut doc = Document::new();
        assert!(doc.detach(doc.root()).is_err());
    }

    #[test]
    fn test_next_sibling() {
        let doc = sample();
        let main = doc.children(doc.root())[1];
        let link = doc.children(main)[0];
        let div = doc.children(main)[1];
        assert_eq!(doc.next_sibling(link), Some(div));
        assert_eq!(doc.next_sibling(div), None);
    }

    #[test]
    fn test_move_node_positions() {
        let mut doc = Document::from_html("<ul><li id=\"a\">a</li><li id=\"b\">b</li><li id=\"c\">c</li></ul>");
        let list = doc.children(doc.root())[0];
        let a = doc.children(list)[0];
        let c = doc.children(list)[2];

        doc.move_node(a, c, InsertPosition::After).unwrap();
        let order: Vec<_> = doc
            .children(list)
            .iter()
            .map(|li| doc.element(*li).unwrap().id().unwrap().to_string())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_move_into_own_subtree_rejected() {
        let mut doc = Document::from_html("<div id=\"outer\"><div id=\"inner\"></div></div>");
        let outer = doc.children(doc.root())[0];
        let inner = doc.children(outer)[0];

        let before = doc.outer_html(doc.root());
        let err = doc.move_node(outer, inner, InsertPosition::FirstChild).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralTarget(_)));
        assert_eq!(doc.outer_html(doc.root()), before);

        let err = doc.move_node(outer, outer, InsertPosition::After).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralTarget(_)));
    }

    #[test]
    fn test_set_text_content_returns_previous_children() {
        let mut doc = Document::from_html("<p id=\"p\"><span>old</span> text</p>");
        let p = doc.children(doc.root())[0];

        let previous = doc.set_text_content(p, "new").unwrap();
        assert_eq!(doc.text_content(p), "new");
        assert_eq!(previous.len(), 2);

        // restoring by hand round-trips
        doc.take_children(p);
        for child in previous {
            doc.append_child(p, child).unwrap();
        }
        assert_eq!(doc.text_content(p), "old text");
    }

    #[test]
    fn test_inner_and_outer_html() {
        let doc = Document::from_html("<div class=\"a\"><em>hi</em> there</div>");
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.inner_html(div), "<em>hi</em> there");
        assert_eq!(doc.outer_html(div), "<div class=\"a\"><em>hi</em> there</div>");
    }

    #[test]
    fn test_html_escaping() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();
        let text = doc.create_text("a < b & c");
        doc.append_child(div, text).unwrap();
        doc.element_mut(div).unwrap().set_attribute("title", "say \"hi\"");

        assert_eq!(
            doc.outer_html(div),
            "<div title=\"say &quot;hi&quot;\">a &lt; b &amp; c</div>"
        );
    }

    #[test]
    fn test_void_element_serialization() {
        let doc = Document::from_html("<p>one<br>two</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.inner_html(p), "one<br>two");
    }

    #[test]
    fn test_select_unique() {
        let doc = sample();
        let button = doc.select_unique("#nav-btn").unwrap();
        assert_eq!(doc.tag_name(button), Some("button"));

        let err = doc.select_unique("#missing").unwrap_err();
        assert_eq!(err, EditError::selector_miss("#missing", 0));
    }

    #[test]
    fn test_select_unique_ambiguous() {
        let doc = Document::from_html("<p class=\"x\"></p><p class=\"x\"></p>");
        let err = doc.select_unique("p.x").unwrap_err();
        assert_eq!(err, EditError::selector_miss("p.x", 2));
    }
}
