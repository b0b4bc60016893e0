use crate::changes::record::{ChangeOp, ChangeRecord};
use crate::config::EngineOptions;
use crate::dom::document::Document;
use crate::dom::node::NodeId;
use crate::dom::selector::{SelectorGenerator, is_editor_owned};
use crate::drag::position::{DropResolution, resolve};

/// Ephemeral state for one drag gesture.
///
/// Created on pointer-down, destroyed on pointer-up or Escape. The original
/// parent and next-sibling are captured so a cancelled gesture can always
/// put the element back exactly where it was.
pub struct DragSession {
    source: NodeId,
    original_parent: NodeId,
    original_next_sibling: Option<NodeId>,
    clone: NodeId,
    hover: Option<(NodeId, DropResolution)>,
}

impl DragSession {
    /// The element being dragged
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The currently highlighted candidate target, if any
    pub fn hover_target(&self) -> Option<(NodeId, DropResolution)> {
        self.hover
    }
}

/// Pointer-driven structural editing: drag an element, preview the move,
/// emit a single `move` change record.
///
/// The controller is a state machine (`Idle → Dragging → Dropped/Cancelled
/// → Idle`) holding at most one [`DragSession`]. A drop's visible
/// relocation is only a preview: the element is restored after the settle
/// delay, and the authoritative relocation happens when the emitted record
/// is applied through the change applier.
pub struct DragController {
    options: EngineOptions,
    session: Option<DragSession>,
}

impl DragController {
    /// Create an idle controller
    pub fn new(options: EngineOptions) -> Self {
        Self { options, session: None }
    }

    /// Whether a drag session is active
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Start a drag over the element under the pointer.
    ///
    /// Returns false (and stays idle) over the editor's own UI, over empty
    /// space, or while another drag is already in progress.
    pub fn pointer_down(&mut self, doc: &mut Document, x: f64, y: f64) -> bool {
        if self.session.is_some() {
            log::debug!("pointer down ignored, a drag is already in progress");
            return false;
        }
        let Some(source) = self.hit_test(doc, x, y) else {
            return false;
        };
        let Some(original_parent) = doc.parent(source) else {
            return false;
        };
        let original_next_sibling = doc.next_sibling(source);
        let clone = self.create_clone(doc, source, x, y);

        self.session = Some(DragSession {
            source,
            original_parent,
            original_next_sibling,
            clone,
            hover: None,
        });
        true
    }

    /// Track the pointer: move the clone and re-highlight the candidate
    /// drop zone under it.
    pub fn pointer_move(&mut self, doc: &mut Document, x: f64, y: f64) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.position_clone(doc, session.clone, x, y);

        if let Some((previous, _)) = session.hover {
            self.unhighlight(doc, previous);
        }

        let hover = self.hit_test(doc, x, y).map(|target| {
            let resolution = resolve(doc, target, session.source, y);
            let class = if resolution.valid {
                self.options.drop_target_class()
            } else {
                self.options.drop_invalid_class()
            };
            if let Some(element) = doc.element_mut(target) {
                element.add_class(&class);
            }
            (target, resolution)
        });

        self.session = Some(DragSession { hover, ..session });
    }

    /// Finish the drag.
    ///
    /// Over a valid target this previews the relocation, waits the settle
    /// delay, restores the element, and emits exactly one `move` record.
    /// Anywhere else it cancels and emits nothing.
    pub fn pointer_up(&mut self, doc: &mut Document, _x: f64, _y: f64) -> Option<ChangeRecord> {
        let session = self.session.take()?;
        let _ = doc.detach(session.clone);

        let drop = session
            .hover
            .filter(|(target, resolution)| resolution.valid && doc.is_attached(*target));
        let Some((target, resolution)) = drop else {
            self.clear_highlights(doc);
            return None;
        };

        // selectors describe the pre-move document; the preview below must
        // not influence them
        let generator = SelectorGenerator::new(&self.options);
        let source_selector = generator.generate(doc, session.source);
        let target_selector = generator.generate(doc, target);

        if let Err(err) = doc.move_node(session.source, target, resolution.position) {
            log::warn!("drop preview failed: {}", err);
            self.clear_highlights(doc);
            return None;
        }

        let success_class = self.options.drop_success_class();
        if let Some(element) = doc.element_mut(session.source) {
            element.add_class(&success_class);
        }
        if !self.options.settle_delay.is_zero() {
            std::thread::sleep(self.options.settle_delay);
        }
        if let Some(element) = doc.element_mut(session.source) {
            element.remove_class(&success_class);
        }

        self.restore_source(doc, &session);
        self.clear_highlights(doc);

        Some(ChangeRecord::new(
            source_selector,
            ChangeOp::Move { target_selector, position: resolution.position },
        ))
    }

    /// Cancel the drag, restoring the document exactly as it was
    pub fn escape(&mut self, doc: &mut Document) {
        let Some(session) = self.session.take() else {
            return;
        };
        let _ = doc.detach(session.clone);
        self.restore_source(doc, &session);
        self.clear_highlights(doc);
    }

    fn unhighlight(&self, doc: &mut Document, target: NodeId) {
        if let Some(element) = doc.element_mut(target) {
            element.remove_class(&self.options.drop_target_class());
            element.remove_class(&self.options.drop_invalid_class());
        }
    }

    /// Put the source back at its captured position if it is not there
    fn restore_source(&self, doc: &mut Document, session: &DragSession) {
        let at_original = doc.parent(session.source) == Some(session.original_parent)
            && doc.next_sibling(session.source) == session.original_next_sibling;
        if at_original {
            return;
        }
        if !doc.is_attached(session.original_parent) {
            log::warn!("cannot restore dragged element, original parent is gone");
            return;
        }
        let _ = doc.detach(session.source);
        let reference = session
            .original_next_sibling
            .filter(|sibling| doc.parent(*sibling) == Some(session.original_parent));
        if let Err(err) = doc.insert_before(session.original_parent, session.source, reference) {
            log::warn!("failed to restore dragged element: {}", err);
        }
    }

    /// Deepest non-editor element with geometry under the pointer
    fn hit_test(&self, doc: &Document, x: f64, y: f64) -> Option<NodeId> {
        let mut best: Option<(usize, NodeId)> = None;
        self.walk_hits(doc, doc.root(), 0, x, y, &mut best);
        best.map(|(_, id)| id)
    }

    fn walk_hits(
        &self,
        doc: &Document,
        id: NodeId,
        depth: usize,
        x: f64,
        y: f64,
        best: &mut Option<(usize, NodeId)>,
    ) {
        let hit = id != doc.root()
            && doc
                .element(id)
                .and_then(|e| e.bounding_box)
                .is_some_and(|bbox| bbox.contains(x, y))
            && !is_editor_owned(doc, id, &self.options);
        if hit && best.map_or(true, |(d, _)| depth >= d) {
            *best = Some((depth, id));
        }
        for child in doc.children(id).to_vec() {
            self.walk_hits(doc, child, depth + 1, x, y, best);
        }
    }

    fn create_clone(&self, doc: &mut Document, source: NodeId, x: f64, y: f64) -> NodeId {
        let tag = doc.tag_name(source).unwrap_or("div").to_string();
        let attributes = doc.element(source).map(|e| e.attributes.clone()).unwrap_or_default();
        let text = doc.text_content(source);

        let clone = doc.create_element(tag);
        if let Some(element) = doc.element_mut(clone) {
            element.attributes = attributes;
            element.remove_attribute("id");
            element.add_class(&self.options.drag_clone_class());
        }
        self.position_clone(doc, clone, x, y);
        if !text.is_empty() {
            let text_node = doc.create_text(text);
            let _ = doc.append_child(clone, text_node);
        }
        let root = doc.root();
        let _ = doc.append_child(root, clone);
        clone
    }

    fn position_clone(&self, doc: &mut Document, clone: NodeId, x: f64, y: f64) {
        if let Some(element) = doc.element_mut(clone) {
            let mut style = element.style_map();
            style.insert("position".to_string(), "fixed".to_string());
            style.insert("pointer-events".to_string(), "none".to_string());
            style.insert("left".to_string(), format!("{}px", x));
            style.insert("top".to_string(), format!("{}px", y));
            element.set_style_map(&style);
        }
    }

    /// Strip highlight classes from every element in the document
    fn clear_highlights(&self, doc: &mut Document) {
        let classes = self.options.highlight_classes();
        for id in doc.all_elements() {
            if let Some(element) = doc.element_mut(id) {
                for class in &classes {
                    element.remove_class(class);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::record::InsertPosition;
    use crate::dom::node::BoundingBox;
    use std::time::Duration;

    fn options() -> EngineOptions {
        EngineOptions::default().settle_delay(Duration::ZERO)
    }

    /// Two stacked cards; #second sits below #first
    fn fixture() -> Document {
        let mut doc = Document::from_html(
            "<div id=\"first\" class=\"card\">first</div><div id=\"second\" class=\"card\">second</div>",
        );
        let first = doc.select_unique("#first").unwrap();
        let second = doc.select_unique("#second").unwrap();
        doc.set_bounding_box(first, BoundingBox::new(0.0, 0.0, 200.0, 40.0));
        doc.set_bounding_box(second, BoundingBox::new(0.0, 40.0, 200.0, 40.0));
        doc
    }

    fn body_ids(doc: &Document) -> Vec<String> {
        doc.children(doc.root())
            .iter()
            .filter_map(|c| doc.element(*c))
            .filter_map(|e| e.id().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_drop_emits_move_record_and_restores_dom() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        assert!(controller.pointer_down(&mut doc, 10.0, 60.0)); // grabs #second
        controller.pointer_move(&mut doc, 10.0, 2.0); // top quarter of #first
        let record = controller.pointer_up(&mut doc, 10.0, 2.0).expect("a move record");

        assert_eq!(record.selector, "#second");
        assert_eq!(
            record.op,
            ChangeOp::Move {
                target_selector: "#first".to_string(),
                position: InsertPosition::Before,
            }
        );

        // the preview was rolled back: drop emission and DOM mutation are decoupled
        assert_eq!(body_ids(&doc), vec!["first", "second"]);
        assert!(!controller.is_dragging());
        assert_no_highlights(&doc);
    }

    #[test]
    fn test_clone_exists_only_while_dragging() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        controller.pointer_down(&mut doc, 10.0, 60.0);
        assert_eq!(doc.select_all("div.domedit-drag-clone").len(), 1);

        controller.pointer_up(&mut doc, 10.0, 60.0);
        assert!(doc.select_all("div.domedit-drag-clone").is_empty());
    }

    #[test]
    fn test_drop_over_own_subtree_is_rejected() {
        let mut doc = Document::from_html(
            "<div id=\"outer\"><p id=\"inner\">x</p></div>",
        );
        let outer = doc.select_unique("#outer").unwrap();
        let inner = doc.select_unique("#inner").unwrap();
        doc.set_bounding_box(outer, BoundingBox::new(0.0, 0.0, 200.0, 100.0));
        doc.set_bounding_box(inner, BoundingBox::new(10.0, 10.0, 100.0, 20.0));

        let mut controller = DragController::new(options());
        // grab #outer at a point only its own box covers
        assert!(controller.pointer_down(&mut doc, 150.0, 80.0));
        // hover over #inner, a descendant of the dragged element
        controller.pointer_move(&mut doc, 20.0, 15.0);

        let (target, resolution) = controller.session().unwrap().hover_target().unwrap();
        assert_eq!(target, inner);
        assert!(!resolution.valid);
        assert!(doc.element(inner).unwrap().has_class("domedit-drop-invalid"));

        assert!(controller.pointer_up(&mut doc, 20.0, 15.0).is_none());
        assert_eq!(doc.parent(inner), Some(outer));
        assert_eq!(doc.parent(outer), Some(doc.root()));
        assert_no_highlights(&doc);
    }

    #[test]
    fn test_escape_cancels_and_restores() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        controller.pointer_down(&mut doc, 10.0, 60.0);
        controller.pointer_move(&mut doc, 10.0, 20.0);
        controller.escape(&mut doc);

        assert!(!controller.is_dragging());
        assert_eq!(body_ids(&doc), vec!["first", "second"]);
        assert!(doc.select_all("div.domedit-drag-clone").is_empty());
        assert_no_highlights(&doc);
    }

    #[test]
    fn test_pointer_down_on_editor_ui_ignored() {
        let mut doc = Document::from_html("<div id=\"domedit-root\"><button>tool</button></div>");
        let root_panel = doc.select_unique("#domedit-root").unwrap();
        let button = doc.children(root_panel)[0];
        doc.set_bounding_box(root_panel, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        doc.set_bounding_box(button, BoundingBox::new(0.0, 0.0, 50.0, 20.0));

        let mut controller = DragController::new(options());
        assert!(!controller.pointer_down(&mut doc, 10.0, 10.0));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_second_pointer_down_ignored_while_dragging() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        assert!(controller.pointer_down(&mut doc, 10.0, 60.0));
        let source = controller.session().unwrap().source();
        assert!(!controller.pointer_down(&mut doc, 10.0, 20.0));
        assert_eq!(controller.session().unwrap().source(), source);
    }

    #[test]
    fn test_pointer_up_without_target_cancels() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        controller.pointer_down(&mut doc, 10.0, 60.0);
        controller.pointer_move(&mut doc, 500.0, 500.0); // empty space
        assert!(controller.pointer_up(&mut doc, 500.0, 500.0).is_none());
        assert_eq!(body_ids(&doc), vec!["first", "second"]);
    }

    #[test]
    fn test_highlight_moves_with_pointer() {
        let mut doc = fixture();
        let mut controller = DragController::new(options());

        controller.pointer_down(&mut doc, 10.0, 60.0);
        controller.pointer_move(&mut doc, 10.0, 2.0);
        let first = doc.select_unique("#first").unwrap();
        assert!(doc.element(first).unwrap().has_class("domedit-drop-target"));

        controller.pointer_move(&mut doc, 500.0, 500.0);
        assert!(!doc.element(first).unwrap().has_class("domedit-drop-target"));

        controller.escape(&mut doc);
    }

    fn assert_no_highlights(doc: &Document) {
        let classes = EngineOptions::default().highlight_classes();
        for id in doc.all_elements() {
            let element = doc.element(id).unwrap();
            for class in &classes {
                assert!(!element.has_class(class), "leftover highlight {:?}", class);
            }
        }
    }
}
