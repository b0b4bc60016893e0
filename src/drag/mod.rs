//! Pointer-driven structural editing.
//!
//! This module provides:
//! - DragController: the drag gesture state machine and its DragSession
//! - resolve / DropResolution: pointer-to-insertion-position resolution

pub mod controller;
pub mod position;

pub use controller::{DragController, DragSession};
pub use position::{DropResolution, resolve};
