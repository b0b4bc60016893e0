use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Handle to a node in a [`Document`](crate::dom::Document) arena.
///
/// Ids are never reused, so a stale handle can always be re-validated
/// against the document before use instead of dereferencing freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index, mostly useful for diagnostics
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A single node slot in the document arena
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

/// Node payload: an element or a text run
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// Element payload: tag, attributes, and layout geometry
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// HTML tag name (e.g., "div", "button", "input"), lowercase
    pub tag_name: String,

    /// Element attributes in author order (e.g., id, class, href, etc.)
    pub attributes: IndexMap<String, String>,

    /// Bounding box supplied by whatever rendered the document
    pub bounding_box: Option<BoundingBox>,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementData {
    /// Create element data for a tag with no attributes
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            bounding_box: None,
        }
    }

    /// Get attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute, returning the previous value if any
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Remove an attribute, returning the previous value if any
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.shift_remove(key)
    }

    /// Element id attribute
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Whitespace-separated class tokens in attribute order
    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Check if the element carries a specific class token
    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().iter().any(|c| *c == class_name)
    }

    /// Add a class token unless already present
    pub fn add_class(&mut self, class_name: &str) {
        if self.has_class(class_name) {
            return;
        }
        let value = match self.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class_name),
            _ => class_name.to_string(),
        };
        self.set_attribute("class", value);
    }

    /// Remove a class token; drops the class attribute when it empties out
    pub fn remove_class(&mut self, class_name: &str) {
        let Some(existing) = self.attribute("class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class_name).collect();
        if remaining.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", remaining.join(" "));
        }
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Inline style declarations parsed from the `style` attribute
    pub fn style_map(&self) -> IndexMap<String, String> {
        self.attribute("style").map(parse_inline_style).unwrap_or_default()
    }

    /// Replace the `style` attribute from a declaration map
    pub fn set_style_map(&mut self, map: &IndexMap<String, String>) {
        if map.is_empty() {
            self.remove_attribute("style");
        } else {
            self.set_attribute("style", render_inline_style(map));
        }
    }
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box has non-zero dimensions
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Check if a point falls inside the box
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Vertical midpoint of the box
    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Parse an inline style string ("color: red; margin: 0") into a declaration map
pub fn parse_inline_style(style: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim();
        let value = value.trim();
        if !property.is_empty() && !value.is_empty() {
            map.insert(property.to_string(), value.to_string());
        }
    }
    map
}

/// Render a declaration map back into an inline style string
pub fn render_inline_style(map: &IndexMap<String, String>) -> String {
    map.iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ")
}
