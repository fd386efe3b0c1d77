//! # Edit History
//!
//! Snapshot-based undo/redo.
//!
//! ## Design
//!
//! - Every completed session stores a snapshot of the whole document
//! - The newest snapshot stays pending until the next one arrives; it is
//!   then pushed onto the undo stack unless the two group
//! - Two snapshots group when they carry the same edit action and were
//!   taken less than the grouping timeout apart
//! - Stepping backward or forward rebuilds the post from the popped
//!   snapshot and pushes the current state onto the opposite stack
//! - Both stacks are bounded; the oldest entry is dropped first
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = EditHistory::new(5, Duration::milliseconds(5000), FormatVersion::V0_3_2);
//! history.store_snapshot(&post, range, Some(EditAction::InsertText), Utc::now())?;
//!
//! let mut editor = PostEditor::new(&mut post, range);
//! history.step_backward(&mut editor, Utc::now())?;
//! editor.complete()?;
//! ```

use crate::config::EditorConfig;
use crate::errors::EditorResult;
use crate::post_editor::PostEditor;
use chrono::{DateTime, Duration, Utc};
use folio_model::{parser, serializer, Direction, FormatVersion, Position, Post, Range, SerializedPost};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// What kind of edit a session performed; only same-kind sessions group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditAction {
    InsertText,
    Delete,
}

/// A range addressed by leaf-section index, so it survives a rebuild of
/// the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRange {
    pub head: (usize, usize),
    pub tail: (usize, usize),
    pub direction: Option<Direction>,
}

impl SnapshotRange {
    /// `None` for blank or detached ranges.
    pub fn capture(post: &Post, range: Range) -> Option<Self> {
        let head = (range.head.leaf_section_index(post)?, range.head.offset());
        let tail = (range.tail.leaf_section_index(post)?, range.tail.offset());
        Some(Self {
            head,
            tail,
            direction: range.direction,
        })
    }

    pub fn resolve(&self, post: &Post) -> Option<Range> {
        let head = Position::from_leaf_index(post, self.head.0, self.head.1).ok()?;
        let tail = Position::from_leaf_index(post, self.tail.0, self.tail.1).ok()?;
        Some(Range::new(head, tail, self.direction))
    }
}

/// A serialized copy of the document at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: SerializedPost,
    pub range: Option<SnapshotRange>,
    pub taken_at: DateTime<Utc>,
    pub edit_action: Option<EditAction>,
}

impl Snapshot {
    pub fn take(
        post: &Post,
        range: Range,
        edit_action: Option<EditAction>,
        taken_at: DateTime<Utc>,
        version: FormatVersion,
    ) -> EditorResult<Self> {
        Ok(Self {
            document: serializer::serialize(post, version)?,
            range: SnapshotRange::capture(post, range),
            taken_at,
            edit_action,
        })
    }

    pub fn groups_with(&self, other: &Snapshot, timeout: Duration) -> bool {
        let elapsed = self.taken_at - other.taken_at;
        self.edit_action.is_some()
            && self.edit_action == other.edit_action
            && elapsed < timeout
            && -elapsed < timeout
    }

    /// Replace the session's post with this snapshot's content.
    fn restore(&self, editor: &mut PostEditor<'_>) -> EditorResult<()> {
        editor.remove_all_sections()?;
        let sections = parser::parse_sections(&mut editor.builder(), &self.document)?;
        editor.migrate_sections(sections)?;

        let range = self
            .range
            .and_then(|range| range.resolve(editor.post()))
            .unwrap_or_else(|| Range::collapsed(editor.post().tail_position()));
        editor.set_range(range);
        Ok(())
    }
}

#[derive(Debug)]
pub struct EditHistory {
    /// Older states, most recent last
    undo_stack: VecDeque<Snapshot>,

    /// Undone states, most recent last
    redo_stack: VecDeque<Snapshot>,

    /// State after the latest session, not yet on the undo stack
    pending: Option<Snapshot>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    group_timeout: Duration,
    version: FormatVersion,
}

impl EditHistory {
    pub fn new(max_levels: usize, group_timeout: Duration, version: FormatVersion) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            pending: None,
            max_levels,
            group_timeout,
            version,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            config.undo_depth,
            config.undo_block_timeout(),
            config.serialization_version,
        )
    }

    /// Record the state after a session.
    pub fn store_snapshot(
        &mut self,
        post: &Post,
        range: Range,
        edit_action: Option<EditAction>,
        now: DateTime<Utc>,
    ) -> EditorResult<()> {
        let snapshot = Snapshot::take(post, range, edit_action, now, self.version)?;

        if let Some(pending) = self.pending.take() {
            if pending.groups_with(&snapshot, self.group_timeout) {
                debug!(action = ?edit_action, "Grouped snapshot with pending");
            } else {
                Self::push_bounded(&mut self.undo_stack, pending, self.max_levels);
            }
            self.redo_stack.clear();
        }

        self.pending = Some(snapshot);
        Ok(())
    }

    /// Re-capture the pending snapshot's range, so undo lands the cursor
    /// where it was when the next session began.
    pub fn refresh_pending_range(&mut self, post: &Post, range: Range) {
        if let Some(pending) = &mut self.pending {
            pending.range = SnapshotRange::capture(post, range);
        }
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&Snapshot> {
        self.pending.as_ref()
    }

    /// Undo one step. Returns whether there was anything to undo.
    pub fn step_backward(&mut self, editor: &mut PostEditor<'_>, now: DateTime<Utc>) -> EditorResult<bool> {
        self.pending = None;
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        let current = Snapshot::take(editor.post(), editor.range(), None, now, self.version)?;
        Self::push_bounded(&mut self.redo_stack, current, self.max_levels);
        snapshot.restore(editor)?;

        info!(undo = self.undo_stack.len(), redo = self.redo_stack.len(), "Stepped backward");
        Ok(true)
    }

    /// Redo one step. Returns whether there was anything to redo.
    pub fn step_forward(&mut self, editor: &mut PostEditor<'_>, now: DateTime<Utc>) -> EditorResult<bool> {
        self.pending = None;
        let Some(snapshot) = self.redo_stack.pop_back() else {
            return Ok(false);
        };

        let current = Snapshot::take(editor.post(), editor.range(), None, now, self.version)?;
        Self::push_bounded(&mut self.undo_stack, current, self.max_levels);
        snapshot.restore(editor)?;

        info!(undo = self.undo_stack.len(), redo = self.redo_stack.len(), "Stepped forward");
        Ok(true)
    }

    fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, max_levels: usize) {
        stack.push_back(snapshot);
        if max_levels > 0 {
            while stack.len() > max_levels {
                stack.pop_front();
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}
