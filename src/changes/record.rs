use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One declarative, replayable edit operation targeting a selector.
///
/// Records are plain data: whatever authored the edit (a human editing
/// session or an external generator) hands them to the engine as-is, and
/// the engine hands `move` records it produces back in the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ChangeRecord {
    /// Selector identifying the element the operation targets
    pub selector: String,

    /// Disabled records round-trip through serialization but are never applied
    #[serde(default)]
    pub disabled: bool,

    /// The operation itself, discriminated by a `type` field on the wire
    #[serde(flatten)]
    pub op: ChangeOp,
}

impl ChangeRecord {
    /// Create an enabled record
    pub fn new(selector: impl Into<String>, op: ChangeOp) -> Self {
        Self { selector: selector.into(), disabled: false, op }
    }

    /// Builder method: mark the record disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// The closed set of edit operation kinds.
///
/// Apply and revert logic is a single exhaustive match over this enum, so
/// adding a kind is a compile-checked change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeOp {
    /// Replace the element's text content
    Text { value: String },

    /// Overlay or replace the element's inline style declarations
    Style {
        properties: IndexMap<String, String>,
        #[serde(default, rename = "mergeMode")]
        merge_mode: bool,
    },

    /// Pseudo-state styling written as rules in the engine-owned stylesheet,
    /// since hover/active/focus cannot be expressed inline
    StyleRules {
        states: IndexMap<PseudoState, IndexMap<String, String>>,
        #[serde(default = "default_true")]
        important: bool,
    },

    /// Add and remove class tokens
    Class {
        #[serde(default)]
        add: Vec<String>,
        #[serde(default)]
        remove: Vec<String>,
    },

    /// Overlay or replace the element's attributes
    Attribute {
        values: IndexMap<String, String>,
        #[serde(default, rename = "mergeMode")]
        merge_mode: bool,
    },

    /// Replace the element's inner markup. The markup is trusted as-is;
    /// sanitizing untrusted input is an upstream responsibility.
    Html { value: String },

    /// Arbitrary code run in page context via the embedder's
    /// [`ScriptHost`](crate::changes::ScriptHost); no revert semantics
    Javascript { value: String },

    /// Relocate the element relative to another element
    Move {
        #[serde(rename = "targetSelector")]
        target_selector: String,
        position: InsertPosition,
    },

    /// Remove the element from the document
    Remove,

    /// Insert new markup relative to the element
    Insert { html: String, position: InsertPosition },

    /// Insert a new element synthesized from structured attributes
    Create { element: ElementSpec, position: InsertPosition },
}

impl ChangeOp {
    /// Wire name of this operation kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Style { .. } => "style",
            Self::StyleRules { .. } => "styleRules",
            Self::Class { .. } => "class",
            Self::Attribute { .. } => "attribute",
            Self::Html { .. } => "html",
            Self::Javascript { .. } => "javascript",
            Self::Move { .. } => "move",
            Self::Remove => "remove",
            Self::Insert { .. } => "insert",
            Self::Create { .. } => "create",
        }
    }

    /// Whether this kind alters tree shape rather than element content
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::Remove | Self::Insert { .. } | Self::Create { .. }
        )
    }
}

fn default_true() -> bool {
    true
}

/// Pseudo-states addressable by `styleRules` records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PseudoState {
    Normal,
    Hover,
    Active,
    Focus,
}

impl PseudoState {
    /// CSS selector suffix for this state
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Hover => ":hover",
            Self::Active => ":active",
            Self::Focus => ":focus",
        }
    }
}

/// Insertion position relative to a target element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InsertPosition {
    Before,
    After,
    FirstChild,
    LastChild,
}

/// Structured description of an element for `create` records
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ElementSpec {
    /// Tag name of the new element
    pub tag: String,

    /// Attributes in author order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Optional text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Nested child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Create a spec for a bare tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder method: set an attribute
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set text content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder method: add a child element
    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// An ordered list of change records belonging to one named variant.
///
/// Order matters: records apply in list order and revert in reverse order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ChangeSet {
    /// Name of the variant that owns this set
    pub variant: String,

    /// Records in application order
    #[serde(default)]
    pub records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Create an empty set for a variant
    pub fn new(variant: impl Into<String>) -> Self {
        Self { variant: variant.into(), records: Vec::new() }
    }

    /// Append a record
    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    /// Number of records, disabled ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the set has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that will actually be applied, with their list indices
    pub fn enabled(&self) -> impl Iterator<Item = (usize, &ChangeRecord)> {
        self.records.iter().enumerate().filter(|(_, r)| !r.disabled)
    }

    /// Serialize the set to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a set from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
