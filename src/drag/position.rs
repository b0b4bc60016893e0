use crate::changes::record::InsertPosition;
use crate::dom::document::Document;
use crate::dom::node::NodeId;

/// Tags that never take dropped children: void/replaced elements and form
/// controls fall back to an `After` drop instead of `FirstChild`/`LastChild`
const CONTAINER_DENY: &[&str] = &[
    "area", "base", "br", "canvas", "col", "embed", "hr", "iframe", "img", "input", "link",
    "meta", "select", "source", "textarea", "track", "video", "wbr",
];

/// Resolved drop position for a candidate target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropResolution {
    /// Where the dragged element would land relative to the target
    pub position: InsertPosition,

    /// False when dropping here would be rejected (self/descendant target,
    /// or a target with no layout box)
    pub valid: bool,
}

/// Resolve an insertion position from a pointer location over a target.
///
/// The target's bounding box splits into three horizontal bands: the top
/// quarter means `Before`, the bottom quarter `After`, and the middle half
/// `FirstChild` or `LastChild` depending on which side of the vertical
/// midpoint the pointer sits. Targets that cannot contain children fall
/// back to `After` for the middle band.
pub fn resolve(doc: &Document, target: NodeId, dragged: NodeId, pointer_y: f64) -> DropResolution {
    let valid = target != dragged && !doc.is_descendant_of(target, dragged);

    let Some(bbox) = doc.element(target).and_then(|e| e.bounding_box) else {
        return DropResolution { position: InsertPosition::After, valid: false };
    };
    if !bbox.is_visible() {
        return DropResolution { position: InsertPosition::After, valid: false };
    }

    let offset = (pointer_y - bbox.y).clamp(0.0, bbox.height);
    let position = if offset < bbox.height * 0.25 {
        InsertPosition::Before
    } else if offset > bbox.height * 0.75 {
        InsertPosition::After
    } else if can_contain_children(doc, target) {
        if pointer_y < bbox.mid_y() {
            InsertPosition::FirstChild
        } else {
            InsertPosition::LastChild
        }
    } else {
        InsertPosition::After
    };

    DropResolution { position, valid }
}

fn can_contain_children(doc: &Document, target: NodeId) -> bool {
    doc.tag_name(target)
        .map(|tag| !CONTAINER_DENY.contains(&tag))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::BoundingBox;

    fn fixture() -> (Document, NodeId, NodeId) {
        let mut doc = Document::from_html("<div id=\"target\">t</div><p id=\"dragged\">d</p>");
        let target = doc.select_unique("#target").unwrap();
        let dragged = doc.select_unique("#dragged").unwrap();
        doc.set_bounding_box(target, BoundingBox::new(0.0, 100.0, 200.0, 40.0));
        (doc, target, dragged)
    }

    #[test]
    fn test_band_boundaries() {
        let (doc, target, dragged) = fixture();

        // top quarter: y in [100, 110)
        assert_eq!(resolve(&doc, target, dragged, 105.0).position, InsertPosition::Before);
        // middle half, above midpoint (120)
        assert_eq!(resolve(&doc, target, dragged, 115.0).position, InsertPosition::FirstChild);
        // middle half, below midpoint
        assert_eq!(resolve(&doc, target, dragged, 125.0).position, InsertPosition::LastChild);
        // bottom quarter: y in (130, 140]
        assert_eq!(resolve(&doc, target, dragged, 135.0).position, InsertPosition::After);
    }

    #[test]
    fn test_pointer_outside_box_clamps() {
        let (doc, target, dragged) = fixture();
        assert_eq!(resolve(&doc, target, dragged, 0.0).position, InsertPosition::Before);
        assert_eq!(resolve(&doc, target, dragged, 500.0).position, InsertPosition::After);
    }

    #[test]
    fn test_deny_list_falls_back_to_after() {
        let mut doc = Document::from_html("<img id=\"pic\"><p id=\"dragged\">d</p>");
        let img = doc.select_unique("#pic").unwrap();
        let dragged = doc.select_unique("#dragged").unwrap();
        doc.set_bounding_box(img, BoundingBox::new(0.0, 0.0, 100.0, 100.0));

        let resolution = resolve(&doc, img, dragged, 50.0);
        assert_eq!(resolution.position, InsertPosition::After);
        assert!(resolution.valid);
    }

    #[test]
    fn test_self_target_invalid() {
        let (doc, target, _) = fixture();
        let resolution = resolve(&doc, target, target, 105.0);
        assert!(!resolution.valid);
    }

    #[test]
    fn test_descendant_target_invalid() {
        let mut doc = Document::from_html("<div id=\"outer\"><span id=\"inner\">x</span></div>");
        let outer = doc.select_unique("#outer").unwrap();
        let inner = doc.select_unique("#inner").unwrap();
        doc.set_bounding_box(inner, BoundingBox::new(0.0, 0.0, 50.0, 20.0));

        let resolution = resolve(&doc, inner, outer, 10.0);
        assert!(!resolution.valid);
    }

    #[test]
    fn test_missing_geometry_invalid() {
        let doc = Document::from_html("<div id=\"target\">t</div><p id=\"dragged\">d</p>");
        let target = doc.select_unique("#target").unwrap();
        let dragged = doc.select_unique("#dragged").unwrap();

        let resolution = resolve(&doc, target, dragged, 10.0);
        assert!(!resolution.valid);
    }
}
