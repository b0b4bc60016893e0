use crate::changes::record::{ChangeOp, ChangeRecord, ChangeSet, ElementSpec, InsertPosition};
use crate::changes::script::{NoopScriptHost, ScriptHost};
use crate::changes::stylesheet::{RuleHandle, StyleRegistry};
use crate::config::EngineOptions;
use crate::dom::document::Document;
use crate::dom::node::NodeId;
use indexmap::IndexMap;
use serde::Serialize;

/// Undo capture for one applied record.
///
/// Pure runtime bookkeeping: created the instant a record is applied,
/// consumed the instant it is reverted, never serialized.
#[derive(Debug)]
pub struct AppliedChange {
    kind: AppliedKind,
}

#[derive(Debug)]
enum AppliedKind {
    Text { node: NodeId, previous_children: Vec<NodeId> },
    Html { node: NodeId, previous_children: Vec<NodeId> },
    Style { node: NodeId, previous: Option<String> },
    StyleRules { handle: RuleHandle },
    Class { node: NodeId, previous: Option<String> },
    Attribute { node: NodeId, previous: AttributeCapture },
    Javascript,
    Move { node: NodeId, parent: NodeId, next_sibling: Option<NodeId> },
    Remove { node: NodeId, parent: NodeId, next_sibling: Option<NodeId> },
    Insert { nodes: Vec<NodeId> },
    Create { node: NodeId },
}

#[derive(Debug)]
enum AttributeCapture {
    /// Merge mode: prior value (or absence) per touched key
    Touched(Vec<(String, Option<String>)>),
    /// Replace mode: the full original attribute map, restored verbatim
    Full(IndexMap<String, String>),
}

impl AppliedChange {
    /// Wire name of the record kind this capture belongs to
    pub fn kind(&self) -> &'static str {
        match self.kind {
            AppliedKind::Text { .. } => "text",
            AppliedKind::Html { .. } => "html",
            AppliedKind::Style { .. } => "style",
            AppliedKind::StyleRules { .. } => "styleRules",
            AppliedKind::Class { .. } => "class",
            AppliedKind::Attribute { .. } => "attribute",
            AppliedKind::Javascript => "javascript",
            AppliedKind::Move { .. } => "move",
            AppliedKind::Remove { .. } => "remove",
            AppliedKind::Insert { .. } => "insert",
            AppliedKind::Create { .. } => "create",
        }
    }
}

/// Outcome of a set-level apply or revert pass.
///
/// Skips are diagnostics, not failures: one missing target must not abort
/// the rest of the set, so the report carries what was skipped and why.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Records successfully applied (or reverted, for a revert pass)
    pub applied: usize,

    /// Records skipped, with their list index and reason
    pub skipped: Vec<SkippedChange>,
}

/// One record the engine had to skip
#[derive(Debug, Clone, Serialize)]
pub struct SkippedChange {
    /// Index of the record in its change set (stack position for reverts)
    pub index: usize,

    /// The record's selector (its kind name for reverts)
    pub target: String,

    /// Human-readable reason
    pub reason: String,
}

impl ApplyReport {
    /// Check that nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Export to JSON for the presentation layer
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Applies change records to a document and knows how to take them back.
///
/// The applier owns the undo state for everything it currently has applied:
/// `apply_set` pushes captures onto an internal stack, `revert_applied`
/// drains it in reverse order, and `reapply` chains the two so re-applying
/// a set is idempotent. Selectors are resolved against the live document at
/// apply time, every time.
pub struct ChangeApplier {
    options: EngineOptions,
    stylesheet: StyleRegistry,
    script_host: Box<dyn ScriptHost>,
    applied: Vec<AppliedChange>,
}

impl ChangeApplier {
    /// Create an applier with the default (no-op) script host
    pub fn new(options: EngineOptions) -> Self {
        let stylesheet = StyleRegistry::new(&options);
        Self {
            options,
            stylesheet,
            script_host: Box::new(NoopScriptHost),
            applied: Vec::new(),
        }
    }

    /// Builder method: set the host that executes `javascript` records
    pub fn with_script_host(mut self, host: impl ScriptHost + 'static) -> Self {
        self.script_host = Box::new(host);
        self
    }

    /// The options this applier was built with
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// How many applied records are awaiting revert
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Apply one record, returning the capture needed to invert it.
    ///
    /// Errors are per-record and non-fatal; nothing is mutated on error
    /// except a `javascript` host that failed mid-execution.
    pub fn apply(&mut self, doc: &mut Document, record: &ChangeRecord) -> crate::Result<AppliedChange> {
        let kind = match &record.op {
            ChangeOp::Text { value } => {
                let node = doc.select_unique(&record.selector)?;
                let previous_children = doc.set_text_content(node, value)?;
                AppliedKind::Text { node, previous_children }
            }
            ChangeOp::Html { value } => {
                let node = doc.select_unique(&record.selector)?;
                let previous_children = doc.set_inner_html(node, value)?;
                AppliedKind::Html { node, previous_children }
            }
            ChangeOp::Style { properties, merge_mode } => {
                let node = doc.select_unique(&record.selector)?;
                let element = require_element(doc, node)?;
                let previous = element.attribute("style").map(str::to_string);
                let map = if *merge_mode {
                    let mut map = element.style_map();
                    for (property, value) in properties {
                        map.insert(property.clone(), value.clone());
                    }
                    map
                } else {
                    properties.clone()
                };
                element.set_style_map(&map);
                AppliedKind::Style { node, previous }
            }
            ChangeOp::StyleRules { states, important } => {
                // rules target by selector text, so no element lookup is needed:
                // the styling takes effect whenever the selector starts matching
                let handle = self.stylesheet.insert(doc, &record.selector, states, *important);
                AppliedKind::StyleRules { handle }
            }
            ChangeOp::Class { add, remove } => {
                let node = doc.select_unique(&record.selector)?;
                let element = require_element(doc, node)?;
                let previous = element.attribute("class").map(str::to_string);
                for class in add {
                    element.add_class(class);
                }
                for class in remove {
                    element.remove_class(class);
                }
                AppliedKind::Class { node, previous }
            }
            ChangeOp::Attribute { values, merge_mode } => {
                let node = doc.select_unique(&record.selector)?;
                let element = require_element(doc, node)?;
                let previous = if *merge_mode {
                    let touched = values
                        .keys()
                        .map(|key| (key.clone(), element.attribute(key).map(str::to_string)))
                        .collect();
                    for (key, value) in values {
                        element.set_attribute(key.clone(), value.clone());
                    }
                    AttributeCapture::Touched(touched)
                } else {
                    let full = element.attributes.clone();
                    element.attributes = values.clone();
                    AttributeCapture::Full(full)
                };
                AppliedKind::Attribute { node, previous }
            }
            ChangeOp::Javascript { value } => {
                self.script_host.execute(value)?;
                AppliedKind::Javascript
            }
            ChangeOp::Move { target_selector, position } => {
                let node = doc.select_unique(&record.selector)?;
                let target = doc.select_unique(target_selector)?;
                let parent = doc.parent(node).ok_or_else(|| {
                    crate::EditError::ApplyFailed(format!("{:?} has no parent to move from", node))
                })?;
                let next_sibling = doc.next_sibling(node);
                doc.move_node(node, target, *position)?;
                AppliedKind::Move { node, parent, next_sibling }
            }
            ChangeOp::Remove => {
                let node = doc.select_unique(&record.selector)?;
                let parent = doc.parent(node).ok_or_else(|| {
                    crate::EditError::ApplyFailed(format!("{:?} has no parent to remove from", node))
                })?;
                let next_sibling = doc.next_sibling(node);
                doc.detach(node)?;
                AppliedKind::Remove { node, parent, next_sibling }
            }
            ChangeOp::Insert { html, position } => {
                let target = doc.select_unique(&record.selector)?;
                let nodes = doc.create_fragment(html);
                insert_all(doc, target, &nodes, *position)?;
                AppliedKind::Insert { nodes }
            }
            ChangeOp::Create { element, position } => {
                let target = doc.select_unique(&record.selector)?;
                let node = instantiate(doc, element);
                doc.insert_at(target, node, *position)?;
                AppliedKind::Create { node }
            }
        };
        log::debug!("applied {} record at {:?}", record.op.kind(), record.selector);
        Ok(AppliedChange { kind })
    }

    /// Invert one applied record.
    ///
    /// Best-effort: if the captured anchors are gone (e.g. the original
    /// parent was removed by an unrelated mutation), the revert is skipped
    /// with an error rather than corrupting the tree.
    pub fn revert(&mut self, doc: &mut Document, state: AppliedChange) -> crate::Result<()> {
        match state.kind {
            AppliedKind::Text { node, previous_children }
            | AppliedKind::Html { node, previous_children } => {
                require_attached(doc, node)?;
                doc.take_children(node);
                for child in previous_children {
                    doc.append_child(node, child)?;
                }
                Ok(())
            }
            AppliedKind::Style { node, previous } => {
                restore_attribute(doc, node, "style", previous)
            }
            AppliedKind::StyleRules { handle } => {
                self.stylesheet.remove(doc, handle);
                Ok(())
            }
            AppliedKind::Class { node, previous } => {
                restore_attribute(doc, node, "class", previous)
            }
            AppliedKind::Attribute { node, previous } => {
                require_attached(doc, node)?;
                let element = require_element(doc, node)?;
                match previous {
                    AttributeCapture::Touched(entries) => {
                        for (key, value) in entries {
                            match value {
                                Some(value) => element.set_attribute(key, value),
                                None => element.remove_attribute(&key),
                            };
                        }
                    }
                    AttributeCapture::Full(map) => element.attributes = map,
                }
                Ok(())
            }
            // side effects are not tracked; a documented limitation
            AppliedKind::Javascript => Ok(()),
            AppliedKind::Move { node, parent, next_sibling }
            | AppliedKind::Remove { node, parent, next_sibling } => {
                restore_position(doc, node, parent, next_sibling)
            }
            AppliedKind::Insert { nodes } => {
                for node in nodes {
                    doc.detach(node)?;
                }
                Ok(())
            }
            AppliedKind::Create { node } => doc.detach(node),
        }
    }

    /// Apply a set's enabled records in order.
    ///
    /// Captures are pushed onto the applier's revert stack; failed records
    /// are reported and skipped, the rest of the set still applies.
    pub fn apply_set(&mut self, doc: &mut Document, set: &ChangeSet) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (index, record) in set.enabled() {
            match self.apply(doc, record) {
                Ok(state) => {
                    self.applied.push(state);
                    report.applied += 1;
                }
                Err(err) => {
                    log::warn!(
                        "skipping {} record {} of set {:?}: {}",
                        record.op.kind(),
                        index,
                        set.variant,
                        err
                    );
                    report.skipped.push(SkippedChange {
                        index,
                        target: record.selector.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Revert everything currently applied, in reverse application order
    pub fn revert_applied(&mut self, doc: &mut Document) -> ApplyReport {
        let mut report = ApplyReport::default();
        while let Some(state) = self.applied.pop() {
            let index = self.applied.len();
            let kind = state.kind();
            match self.revert(doc, state) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    log::warn!("skipping revert of {} capture: {}", kind, err);
                    report.skipped.push(SkippedChange {
                        index,
                        target: kind.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Revert whatever is applied, then apply the set from scratch.
    ///
    /// Idempotent: calling this repeatedly with the same set leaves the
    /// document in the same state as a single call.
    pub fn reapply(&mut self, doc: &mut Document, set: &ChangeSet) -> ApplyReport {
        let reverted = self.revert_applied(doc);
        let mut report = self.apply_set(doc, set);
        let mut skipped = reverted.skipped;
        skipped.extend(report.skipped);
        report.skipped = skipped;
        report
    }
}

fn require_element<'a>(doc: &'a mut Document, node: NodeId) -> crate::Result<&'a mut crate::dom::ElementData> {
    doc.element_mut(node)
        .ok_or_else(|| crate::EditError::ApplyFailed(format!("{:?} is not an element", node)))
}

fn require_attached(doc: &Document, node: NodeId) -> crate::Result<()> {
    if doc.is_attached(node) {
        Ok(())
    } else {
        Err(crate::EditError::ApplyFailed(format!("{:?} is detached", node)))
    }
}

fn restore_attribute(
    doc: &mut Document,
    node: NodeId,
    key: &str,
    previous: Option<String>,
) -> crate::Result<()> {
    require_attached(doc, node)?;
    let element = require_element(doc, node)?;
    match previous {
        Some(value) => {
            element.set_attribute(key, value);
        }
        None => {
            element.remove_attribute(key);
        }
    }
    Ok(())
}

fn restore_position(
    doc: &mut Document,
    node: NodeId,
    parent: NodeId,
    next_sibling: Option<NodeId>,
) -> crate::Result<()> {
    if !doc.is_attached(parent) {
        return Err(crate::EditError::ApplyFailed(
            "original parent is no longer attached".to_string(),
        ));
    }
    doc.detach(node)?;
    // the captured sibling may itself have moved; fall back to appending
    let reference = next_sibling.filter(|sibling| doc.parent(*sibling) == Some(parent));
    doc.insert_before(parent, node, reference)
}

fn insert_all(
    doc: &mut Document,
    target: NodeId,
    nodes: &[NodeId],
    position: InsertPosition,
) -> crate::Result<()> {
    match position {
        InsertPosition::Before | InsertPosition::LastChild => {
            for node in nodes {
                doc.insert_at(target, *node, position)?;
            }
        }
        // reversed so multi-root fragments keep their order
        InsertPosition::After | InsertPosition::FirstChild => {
            for node in nodes.iter().rev() {
                doc.insert_at(target, *node, position)?;
            }
        }
    }
    Ok(())
}

fn instantiate(doc: &mut Document, spec: &ElementSpec) -> NodeId {
    let node = doc.create_element(&spec.tag);
    if let Some(element) = doc.element_mut(node) {
        for (key, value) in &spec.attributes {
            element.set_attribute(key.clone(), value.clone());
        }
    }
    if let Some(text) = &spec.text {
        let text_node = doc.create_text(text.clone());
        let _ = doc.append_child(node, text_node);
    }
    for child_spec in &spec.children {
        let child = instantiate(doc, child_spec);
        let _ = doc.append_child(node, child);
    }
    node
}
