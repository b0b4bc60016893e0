//! # domedit
//!
//! A Rust library for visual document editing: every edit a user makes to a
//! live document is recorded as a declarative, replayable change record, and
//! the full ordered set can be re-applied, updated, previewed, or reverted
//! deterministically, including after the document has been reloaded or the
//! user has switched between competing variants of the same edit set.
//!
//! ## Features
//!
//! - **Change Records**: a closed, serializable union of edit kinds (text,
//!   inline style, pseudo-state style rules, classes, attributes, markup,
//!   scripts, and structural move/insert/remove/create)
//! - **Apply & Revert**: per-record undo capture with best-effort,
//!   non-aborting set application and structured skip reporting
//! - **Stable Selectors**: generated selectors that survive reload and
//!   minor markup drift
//! - **Drag To Reorder**: a pointer-driven drag session that previews a
//!   structural move and emits a single `move` record
//! - **Variant Previews**: at most one previewed change set at a time,
//!   switched atomically
//!
//! ## Applying a Change Set
//!
//! ```rust
//! use domedit::{ChangeApplier, ChangeOp, ChangeRecord, ChangeSet, Document, EngineOptions};
//!
//! let mut doc = Document::from_html("<h1 id=\"title\">Hello</h1>");
//!
//! let mut set = ChangeSet::new("variant-1");
//! set.push(ChangeRecord::new("#title", ChangeOp::Text { value: "Goodbye".to_string() }));
//!
//! let mut applier = ChangeApplier::new(EngineOptions::default());
//! let report = applier.apply_set(&mut doc, &set);
//! assert!(report.is_clean());
//!
//! let title = doc.select_unique("#title").unwrap();
//! assert_eq!(doc.text_content(title), "Goodbye");
//!
//! applier.revert_applied(&mut doc);
//! assert_eq!(doc.text_content(title), "Hello");
//! ```
//!
//! ## Previewing Variants
//!
//! Exactly one variant is visible at a time; switching reverts the old one
//! first:
//!
//! ```rust
//! use domedit::{ChangeOp, ChangeRecord, ChangeSet, Document, EngineOptions, PreviewCoordinator};
//!
//! let mut doc = Document::from_html("<h1 id=\"title\">Hello</h1>");
//! let mut preview = PreviewCoordinator::new(EngineOptions::default());
//!
//! let mut variant = ChangeSet::new("v2");
//! variant.push(ChangeRecord::new("#title", ChangeOp::Text { value: "Hi".to_string() }));
//!
//! preview.set_preview(&mut doc, "v2", Some(&variant));
//! preview.set_preview(&mut doc, "v2", None); // back to the original
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: the host-document substrate (node arena, selectors, geometry)
//! - [`changes`]: change records, the applier, stylesheet and script seams
//! - [`drag`]: drag-to-reorder state machine and drop position resolution
//! - [`preview`]: the single-active-preview coordinator
//! - [`config`]: engine options (reserved UI namespace, settle delay)
//! - [`error`]: error types and result alias

pub mod changes;
pub mod config;
pub mod dom;
pub mod drag;
pub mod error;
pub mod preview;

pub use changes::{
    AppliedChange, ApplyReport, ChangeApplier, ChangeOp, ChangeRecord, ChangeSet, ElementSpec,
    InsertPosition, NoopScriptHost, PseudoState, ScriptHost, SkippedChange, StyleRegistry,
};
pub use config::EngineOptions;
pub use dom::{BoundingBox, Document, ElementData, NodeId, SelectorGenerator, is_editor_owned};
pub use drag::{DragController, DragSession, DropResolution};
pub use error::{EditError, Result};
pub use preview::PreviewCoordinator;
