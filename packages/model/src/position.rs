//! Cursor addressing.
//!
//! A [`Position`] is a leaf section plus an offset counted in UTF-16 code
//! units (atoms, cards and images count as one). Positions are plain values
//! and are resolved against a [`Post`] on demand.

use crate::error::{ModelError, ModelResult};
use crate::leaf::{is_high_surrogate, is_low_surrogate};
use crate::linked_list::LinkedStore;
use crate::markerable::SectionUnit;
use crate::node::NodeId;
use crate::post::Post;
use crate::range::Range;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    section: Option<NodeId>,
    offset: usize,
}

impl Position {
    /// The position that points nowhere.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Checked constructor: `section` must be a leaf section and `offset`
    /// must not exceed its length.
    pub fn new(post: &Post, section: NodeId, offset: usize) -> ModelResult<Self> {
        if !post.node(section)?.is_leaf_section() {
            return Err(ModelError::NotALeafSection(section));
        }
        let length = post.length(section);
        if offset > length {
            return Err(ModelError::out_of_bounds(offset, length));
        }
        Ok(Self {
            section: Some(section),
            offset,
        })
    }

    pub(crate) fn at(section: NodeId, offset: usize) -> Self {
        Self {
            section: Some(section),
            offset,
        }
    }

    /// Start of `section`; lists resolve to their first item.
    pub fn head_of(post: &Post, section: NodeId) -> Self {
        if post.n(section).is_list_section() {
            return match post.first(section) {
                Some(item) => Self::at(item, 0),
                None => Self::blank(),
            };
        }
        Self::at(section, 0)
    }

    /// End of `section`; lists resolve to their last item.
    pub fn tail_of(post: &Post, section: NodeId) -> Self {
        if post.n(section).is_list_section() {
            return match post.last(section) {
                Some(item) => Self::at(item, post.length(item)),
                None => Self::blank(),
            };
        }
        Self::at(section, post.length(section))
    }

    /// Resolve a document-order leaf-section index.
    pub fn from_leaf_index(post: &Post, index: usize, offset: usize) -> ModelResult<Self> {
        let section = post
            .leaf_section_at_index(index)
            .ok_or(ModelError::LeafIndexOutOfBounds(index))?;
        Self::new(post, section, offset)
    }

    pub fn section(&self) -> Option<NodeId> {
        self.section
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_blank(&self) -> bool {
        self.section.is_none()
    }

    pub fn is_head(&self) -> bool {
        self.section.is_some() && self.offset == 0
    }

    pub fn is_tail(&self, post: &Post) -> bool {
        self.section
            .is_some_and(|section| self.offset == post.length(section))
    }

    pub fn is_markerable(&self, post: &Post) -> bool {
        self.section
            .is_some_and(|section| post.n(section).is_markerable())
    }

    pub fn leaf_section_index(&self, post: &Post) -> Option<usize> {
        self.section.and_then(|section| post.leaf_section_index(section))
    }

    /// Leaf at this position and the offset inside it (left leaf at a
    /// boundary).
    pub fn marker_position(&self, post: &Post) -> Option<(NodeId, usize)> {
        let section = self.section?;
        post.marker_position_at_offset(section, self.offset).ok().flatten()
    }

    pub fn marker(&self, post: &Post) -> Option<NodeId> {
        self.marker_position(post).map(|(leaf, _)| leaf)
    }

    pub fn offset_in_marker(&self, post: &Post) -> usize {
        self.marker_position(post).map_or(0, |(_, offset)| offset)
    }

    /// The leaf one would cross moving from here in `direction`.
    pub fn marker_in(&self, post: &Post, direction: Direction) -> Option<NodeId> {
        if !self.is_markerable(post) {
            return None;
        }
        let (leaf, offset) = self.marker_position(post)?;
        let length = post.length(leaf);
        match direction {
            Direction::Backward if offset == 0 => post.prev(leaf),
            Direction::Forward if offset == length => post.next(leaf),
            _ => Some(leaf),
        }
    }

    /// Move by `units` characters, crossing section boundaries. Surrogate
    /// pairs count as one step.
    pub fn move_by(&self, post: &Post, units: isize) -> Self {
        let mut position = *self;
        let direction = if units < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        };
        for _ in 0..units.unsigned_abs() {
            position = match direction {
                Direction::Backward => position.move_left(post),
                Direction::Forward => position.move_right(post),
            };
        }
        position
    }

    pub fn move_left(&self, post: &Post) -> Self {
        let Some(section) = self.section else {
            return *self;
        };
        if self.offset == 0 {
            return match post.previous_leaf_section(section) {
                Some(prev) => Self::tail_of(post, prev),
                None => *self,
            };
        }

        let mut offset = self.offset - 1;
        if post.n(section).is_markerable() && offset > 0 {
            let unit = post.code_unit_at(section, offset);
            let before = post.code_unit_at(section, offset - 1);
            if unit.is_some_and(is_low_surrogate) && before.is_some_and(is_high_surrogate) {
                offset -= 1;
            }
        }
        Self::at(section, offset)
    }

    pub fn move_right(&self, post: &Post) -> Self {
        let Some(section) = self.section else {
            return *self;
        };
        if self.is_tail(post) {
            return match post.next_leaf_section(section) {
                Some(next) => Self::at(next, 0),
                None => *self,
            };
        }

        let mut offset = self.offset + 1;
        if post.n(section).is_markerable() {
            let unit = post.code_unit_at(section, self.offset);
            let after = post.code_unit_at(section, self.offset + 1);
            if unit.is_some_and(is_high_surrogate) && after.is_some_and(is_low_surrogate) {
                offset += 1;
            }
        }
        Self::at(section, offset)
    }

    /// Move to the next word boundary in `direction`.
    ///
    /// At a section edge the move first steps into the neighbouring section
    /// and continues from there. Atoms are a single hop.
    pub fn move_word(&self, post: &Post, direction: Direction) -> Self {
        let Some(section) = self.section else {
            return *self;
        };
        let at_edge = match direction {
            Direction::Backward => self.is_head(),
            Direction::Forward => self.is_tail(post),
        };
        if at_edge {
            let stepped = self.move_by(post, direction.sign());
            if stepped == *self || !stepped.is_markerable(post) {
                return stepped;
            }
            return stepped.move_word(post, direction);
        }
        if !post.n(section).is_markerable() {
            return self.move_by(post, direction.sign());
        }

        let Ok(units) = post.section_units(section) else {
            return *self;
        };
        let offset = match direction {
            Direction::Backward => word_offset_backward(&units, self.offset),
            Direction::Forward => word_offset_forward(&units, self.offset),
        };
        Self::at(section, offset)
    }

    pub fn to_range(self, tail: Position) -> Range {
        Range::new(self, tail, None)
    }

    pub fn to_collapsed_range(self) -> Range {
        Range::collapsed(self)
    }

    /// Document order of two positions.
    pub fn compare(&self, post: &Post, other: &Position) -> Ordering {
        let ours = self.leaf_section_index(post);
        let theirs = other.leaf_section_index(post);
        ours.cmp(&theirs).then(self.offset.cmp(&other.offset))
    }
}

fn is_word_unit(unit: u16) -> bool {
    if is_high_surrogate(unit) || is_low_surrogate(unit) {
        return false;
    }
    match char::from_u32(u32::from(unit)) {
        Some(c) => {
            c.is_alphanumeric()
                || c == '_'
                || ('\u{00C0}'..='\u{1FFF}').contains(&c)
                || ('\u{2C00}'..='\u{D7FF}').contains(&c)
        }
        None => false,
    }
}

fn is_word(unit: &SectionUnit) -> bool {
    matches!(unit, SectionUnit::Text(u) if is_word_unit(*u))
}

fn is_gap(unit: &SectionUnit) -> bool {
    matches!(unit, SectionUnit::Text(u) if !is_word_unit(*u))
}

fn word_offset_backward(units: &[SectionUnit], offset: usize) -> usize {
    let mut offset = offset.min(units.len());
    if offset > 0 && units[offset - 1] == SectionUnit::Atom {
        return offset - 1;
    }
    while offset > 0 && is_gap(&units[offset - 1]) {
        offset -= 1;
    }
    while offset > 0 && is_word(&units[offset - 1]) {
        offset -= 1;
    }
    offset
}

fn word_offset_forward(units: &[SectionUnit], offset: usize) -> usize {
    let mut offset = offset.min(units.len());
    if offset < units.len() && units[offset] == SectionUnit::Atom {
        return offset + 1;
    }
    while offset < units.len() && is_gap(&units[offset]) {
        offset += 1;
    }
    while offset < units.len() && is_word(&units[offset]) {
        offset += 1;
    }
    offset
}
