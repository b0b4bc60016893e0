//! Host-document substrate: the in-memory DOM the engine edits.
//!
//! This module provides:
//! - Document: an id-addressed mutable node arena with structural operations
//! - ElementData / BoundingBox: element payloads and layout geometry
//! - SelectorGenerator: stable selector generation plus the engine's
//!   selector grammar and editor-UI exclusion checks

pub mod document;
pub mod node;
pub mod selector;

mod parse;

pub use document::Document;
pub use node::{BoundingBox, ElementData, NodeId, parse_inline_style, render_inline_style};
pub use selector::{SelectorGenerator, is_editor_owned};
