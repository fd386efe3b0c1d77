//! # Folio Editor
//!
//! Editing engine on top of `folio-model`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Editor: owns Post, cursor range, history    │
//! │  - run(|pe| ...) wraps every change         │
//! │  - renderer bracket + update listeners      │
//! │  - replayable Edit commands                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PostEditor: one mutation session            │
//! │  - text, markup and section operations      │
//! │  - callback queues flushed on complete()    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ EditHistory: serialized snapshots           │
//! │  - bounded undo/redo, time-based grouping   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Sessions are the unit of change**: side effects are queued and run
//!    once, when the session completes
//! 2. **No rollback**: a failed session leaves the post as far as it got
//! 3. **Snapshots, not inverse operations**: undo rebuilds the post from
//!    its serialized form
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{Editor, EditorConfig};
//! use folio_model::{BlockTag, SectionTag, MarkupTag};
//!
//! let mut editor = Editor::new(EditorConfig::default())?;
//! editor.insert_text("Hello")?;
//! editor.toggle_section(BlockTag::Section(SectionTag::H1))?;
//!
//! editor.run(|pe| {
//!     let range = pe.range();
//!     pe.toggle_markup_tag(MarkupTag::Em, range)
//! })?;
//!
//! editor.undo()?;
//! let doc = editor.serialize()?;
//! ```

mod config;
mod editor;
mod errors;
mod history;

pub mod edits;
pub mod post_editor;
pub mod render;

pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use editor::Editor;
pub use edits::{Edit, EditError, Point};
pub use errors::{EditorError, EditorResult};
pub use history::{EditAction, EditHistory, Snapshot, SnapshotRange};
pub use post_editor::{Callback, Completion, DeleteUnit, PostEditor, Queue};
pub use render::{HtmlRenderer, Renderer};
