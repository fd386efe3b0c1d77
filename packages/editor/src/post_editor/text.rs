//! Inserting leaves and deleting content.

use super::PostEditor;
use crate::errors::EditorResult;
use crate::history::EditAction;
use folio_model::leaf::is_low_surrogate;
use folio_model::{Direction, Leaf, LinkedStore, MarkupId, Markuperable, ModelError, NodeId, Position, Range};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Granularity of a single delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteUnit {
    #[default]
    Char,
    Word,
}

impl PostEditor<'_> {
    /// Splice detached leaves into a markerable at `position`. Returns the
    /// position just after the last inserted leaf.
    pub fn insert_markers(&mut self, position: Position, markers: Vec<NodeId>) -> EditorResult<Position> {
        let section = position.section().ok_or(ModelError::BlankPosition)?;
        let mut offset = position.offset();

        self.post.split_marker_at_offset(section, offset)?;
        let mut previous = self.post.marker_before_offset(section, offset)?;
        for marker in markers {
            offset += self.post.leaf(marker)?.length();
            self.post.insert_after(section, marker, previous)?;
            previous = Some(marker);
        }

        self.touch(section);
        self.set_edit_action(EditAction::InsertText);
        let next = Position::new(self.post(), section, offset)?;
        self.set_position(next);
        Ok(next)
    }

    /// Insert `text` carrying the markups active at `position`. A no-op on
    /// cards and images.
    pub fn insert_text(&mut self, position: Position, text: &str) -> EditorResult<Position> {
        if !position.is_markerable(self.post()) {
            return Ok(position);
        }
        let markups = self.post.markups_in_range(&Range::collapsed(position))?;
        self.insert_text_with_markups(position, text, markups)
    }

    pub fn insert_text_with_markups(
        &mut self,
        position: Position,
        text: &str,
        markups: Vec<MarkupId>,
    ) -> EditorResult<Position> {
        if !position.is_markerable(self.post()) {
            return Ok(position);
        }
        let marker = self.post.builder().create_marker(text, markups);
        self.insert_markers(position, vec![marker])
    }

    pub fn insert_atom(
        &mut self,
        position: Position,
        name: &str,
        value: &str,
        payload: Value,
    ) -> EditorResult<Position> {
        if !position.is_markerable(self.post()) {
            return Ok(position);
        }
        let markups = self.post.markups_in_range(&Range::collapsed(position))?;
        let atom = self.post.builder().create_atom(name, value, payload, markups);
        self.insert_markers(position, vec![atom])
    }

    /// Delete one character or word next to `position`.
    ///
    /// A character inside a single marker is removed in place; anything else
    /// (atoms, section edges, words) goes through [`Self::delete_range`].
    pub fn delete_at_position(
        &mut self,
        position: Position,
        direction: Direction,
        unit: DeleteUnit,
    ) -> EditorResult<Position> {
        self.set_edit_action(EditAction::Delete);
        if unit == DeleteUnit::Char {
            if let Some(next) = self.delete_in_marker(position, direction)? {
                self.set_position(next);
                return Ok(next);
            }
        }

        let post = self.post();
        let other = match (unit, direction) {
            (DeleteUnit::Char, Direction::Backward) => position.move_left(post),
            (DeleteUnit::Char, Direction::Forward) => position.move_right(post),
            (DeleteUnit::Word, _) => position.move_word(post, direction),
        };
        let range = match direction {
            Direction::Backward => Range::new(other, position, None),
            Direction::Forward => Range::new(position, other, None),
        };
        self.delete_range(range)
    }

    fn delete_in_marker(&mut self, position: Position, direction: Direction) -> EditorResult<Option<Position>> {
        let Some(section) = position.section() else {
            return Ok(None);
        };
        if !self.post.node(section)?.is_markerable() {
            return Ok(None);
        }
        let unit = match direction {
            Direction::Backward => match position.offset().checked_sub(1) {
                Some(unit) => unit,
                None => return Ok(None),
            },
            Direction::Forward => position.offset(),
        };
        let Some((leaf, leaf_offset)) = self.leaf_at_unit(section, unit)? else {
            return Ok(None);
        };

        let Leaf::Marker(marker) = self.post.leaf_mut(leaf)? else {
            return Ok(None);
        };
        let starts_on_low_half = marker.code_unit_at(leaf_offset).is_some_and(is_low_surrogate);
        let width = marker.delete_value_at_offset(leaf_offset)?;
        let start = if width == 2 && starts_on_low_half { unit - 1 } else { unit };

        self.post.mark_dirty(leaf);
        self.touch(section);
        trace!(%section, %leaf, start, width, "Deleted in marker");
        Ok(Some(Position::new(self.post(), section, start)?))
    }

    /// The leaf holding the unit at section offset `unit`, with the offset
    /// inside it.
    fn leaf_at_unit(&self, section: NodeId, unit: usize) -> EditorResult<Option<(NodeId, usize)>> {
        let mut current = 0;
        for leaf in self.post.items(section) {
            let length = self.post.leaf(leaf)?.length();
            if unit < current + length {
                return Ok(Some((leaf, unit - current)));
            }
            current += length;
        }
        Ok(None)
    }

    /// Delete everything covered by `range` and return where the cursor
    /// belongs afterwards.
    ///
    /// Across sections the head section keeps its prefix, whole sections in
    /// between are removed, and the tail section's remainder is joined onto
    /// the head when both are markerable.
    pub fn delete_range(&mut self, range: Range) -> EditorResult<Position> {
        self.set_edit_action(EditAction::Delete);
        let (Some(head_section), Some(tail_section)) = (range.head.section(), range.tail.section()) else {
            return Ok(range.head);
        };

        if head_section == tail_section {
            let next = self.cut_section(head_section, range)?;
            self.set_position(next);
            return Ok(next);
        }

        let mut next_section = self.post.next_leaf_section(head_section);
        let head_tail = Position::tail_of(self.post(), head_section);
        let mut next = self.cut_section(head_section, Range::new(range.head, head_tail, None))?;
        let head_section = next.section().unwrap_or(head_section);

        while let Some(section) = next_section {
            if section == tail_section {
                break;
            }
            next_section = self.post.next_leaf_section(section);
            self.remove_section(section)?;
        }

        let tail_head = Position::head_of(self.post(), tail_section);
        let tail_position = self.cut_section(tail_section, Range::new(tail_head, range.tail, None))?;
        let tail_section = tail_position.section().unwrap_or(tail_section);

        if self.post.is_blank(tail_section) {
            self.remove_section(tail_section)?;
        } else {
            let head_is_markerable = self.post.node(head_section)?.is_markerable();
            let tail_is_markerable = self.post.node(tail_section)?.is_markerable();
            if head_is_markerable && tail_is_markerable {
                self.post.join(head_section, tail_section)?;
                self.touch(head_section);
                self.remove_section(tail_section)?;
            } else if self.post.is_blank(head_section) {
                self.remove_section(head_section)?;
                next = tail_position;
            }
        }

        trace!(?range, ?next, "Deleted range");
        self.set_position(next);
        Ok(next)
    }

    /// Remove the part of `section` covered by `range`.
    ///
    /// Blank sections and zero-width ranges are left alone. A covered card
    /// or image becomes a blank paragraph.
    pub fn cut_section(&mut self, section: NodeId, range: Range) -> EditorResult<Position> {
        if self.post.is_blank(section) || range.is_collapsed() {
            return Ok(range.head);
        }

        let node = self.post.node(section)?;
        if node.is_card() || node.is_image() {
            let blank = self.create_blank_section()?;
            self.replace_section(section, blank)?;
            return Ok(Position::new(self.post(), blank, 0)?);
        }

        for marker in self.split_markers(range)? {
            self.remove_marker(marker)?;
        }
        Ok(range.head)
    }

    /// Guarantee leaf boundaries at both ends of `range` and return the
    /// leaves it now covers entirely.
    pub fn split_markers(&mut self, range: Range) -> EditorResult<Vec<NodeId>> {
        for position in [range.head, range.tail] {
            let Some(section) = position.section() else {
                continue;
            };
            if self.post.node(section)?.is_markerable() {
                self.post.split_marker_at_offset(section, position.offset())?;
                self.touch(section);
            }
        }
        Ok(self.post.markers_contained_by_range(&range)?)
    }

    pub fn remove_marker(&mut self, marker: NodeId) -> EditorResult<()> {
        let section = self
            .post
            .parent(marker)
            .ok_or(ModelError::NodeNotFound(marker))?;
        self.post.remove(section, marker)?;
        self.touch(section);
        Ok(())
    }
}
