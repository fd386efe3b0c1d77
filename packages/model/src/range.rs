//! Selections between two positions.

use crate::error::{ModelError, ModelResult};
use crate::leaf::Leaf;
use crate::linked_list::LinkedStore;
use crate::node::NodeId;
use crate::position::{Direction, Position};
use crate::post::Post;

/// A head/tail pair of positions with an optional direction telling which
/// end is the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub head: Position,
    pub tail: Position,
    pub direction: Option<Direction>,
}

impl Range {
    pub fn new(head: Position, tail: Position, direction: Option<Direction>) -> Self {
        Self { head, tail, direction }
    }

    pub fn create(
        post: &Post,
        head_section: NodeId,
        head_offset: usize,
        tail_section: NodeId,
        tail_offset: usize,
        direction: Option<Direction>,
    ) -> ModelResult<Self> {
        Ok(Self::new(
            Position::new(post, head_section, head_offset)?,
            Position::new(post, tail_section, tail_offset)?,
            direction,
        ))
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn collapsed(position: Position) -> Self {
        Self::new(position, position, None)
    }

    /// Head to tail of one section.
    pub fn from_section(post: &Post, section: NodeId) -> Self {
        Self::new(
            Position::head_of(post, section),
            Position::tail_of(post, section),
            None,
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_blank(&self) -> bool {
        self.head.is_blank() && self.tail.is_blank()
    }

    /// The fixed end: the tail for a backward selection, otherwise the head.
    pub fn anchor(&self) -> Position {
        match self.direction {
            Some(Direction::Backward) => self.tail,
            _ => self.head,
        }
    }

    /// The moving end.
    pub fn focus(&self) -> Position {
        match self.direction {
            Some(Direction::Backward) => self.head,
            _ => self.tail,
        }
    }

    pub fn head_section(&self) -> Option<NodeId> {
        self.head.section()
    }

    pub fn tail_section(&self) -> Option<NodeId> {
        self.tail.section()
    }

    pub fn head_section_offset(&self) -> usize {
        self.head.offset()
    }

    pub fn tail_section_offset(&self) -> usize {
        self.tail.offset()
    }

    /// Grow or shrink the selection by `units` characters from its focus.
    ///
    /// An undirected or collapsed range takes its direction from the sign
    /// of `units`. Shrinking past the anchor flips the direction.
    pub fn extend(&self, post: &Post, units: isize) -> Self {
        if units == 0 {
            return *self;
        }
        let direction = match self.direction {
            Some(direction) if !self.is_collapsed() => direction,
            _ => {
                if units > 0 {
                    Direction::Forward
                } else {
                    Direction::Backward
                }
            }
        };
        let anchor = if self.is_collapsed() { self.head } else { self.anchor() };
        let focus = if self.is_collapsed() { self.head } else { self.focus() };
        let moved = focus.move_by(post, units);

        match anchor.compare(post, &moved) {
            std::cmp::Ordering::Less => Self::new(anchor, moved, Some(Direction::Forward)),
            std::cmp::Ordering::Greater => Self::new(moved, anchor, Some(Direction::Backward)),
            std::cmp::Ordering::Equal => Self::new(anchor, anchor, Some(direction)),
        }
    }

    /// This range clipped to `section`: offsets of the other sections are
    /// replaced by the section's own head or tail.
    pub fn trim_to(&self, post: &Post, section: NodeId) -> Self {
        let head = if self.head.section() == Some(section) {
            self.head
        } else {
            Position::head_of(post, section)
        };
        let tail = if self.tail.section() == Some(section) {
            self.tail
        } else {
            Position::tail_of(post, section)
        };
        Self::new(head, tail, self.direction)
    }

    /// Widen both ends over the run of adjacent leaves matching `predicate`.
    ///
    /// Only single-section ranges can be expanded.
    pub fn expand_by_marker(&self, post: &Post, predicate: impl Fn(&Leaf) -> bool) -> ModelResult<Self> {
        let section = self.head.section().ok_or(ModelError::BlankPosition)?;
        if self.tail.section() != Some(section) {
            return Err(ModelError::RangeSpansSections);
        }

        let matches = |leaf: NodeId| post.leaf(leaf).map(&predicate).unwrap_or(false);

        let mut head = self.head;
        if let Some(mut first) = self.head.marker(post).filter(|leaf| matches(*leaf)) {
            while let Some(prev) = post.prev(first).filter(|leaf| matches(*leaf)) {
                first = prev;
            }
            head = Position::new(post, section, post.offset_of_marker(section, first)?)?;
        }

        let mut tail = self.tail;
        if let Some(mut last) = self.tail.marker(post).filter(|leaf| matches(*leaf)) {
            while let Some(next) = post.next(last).filter(|leaf| matches(*leaf)) {
                last = next;
            }
            let end = post.offset_of_marker(section, last)? + post.length(last);
            tail = Position::new(post, section, end)?;
        }

        Ok(Self::new(head, tail, self.direction))
    }

    /// First section the range touches.
    pub fn first_section(&self, post: &Post) -> Option<NodeId> {
        self.head.section().map(|section| {
            if post.is_nested(section) {
                post.parent(section).unwrap_or(section)
            } else {
                section
            }
        })
    }

    /// Does the range start at the head of a section whose first item is
    /// `section`?
    pub fn starts_at_head_of(&self, post: &Post, section: NodeId) -> bool {
        self.head.is_head() && post.first_leaf_section(section) == self.head.section()
    }

    pub fn is_at_list_head(&self, post: &Post) -> bool {
        self.head.section().is_some_and(|section| {
            post.is_nested(section)
                && post
                    .parent(section)
                    .and_then(|list| post.first(list))
                    == Some(section)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Markuperable;
    use crate::markup::MarkupTag;
    use crate::section::SectionTag;

    fn single_section(post: &mut Post, parts: &[(&str, bool)]) -> NodeId {
        let link = post.builder().create_markup(
            MarkupTag::A,
            vec![("href".to_string(), "https://example.com".to_string())],
        );
        let mut builder = post.builder();
        let leaves = parts
            .iter()
            .map(|(text, linked)| builder.create_marker(text, if *linked { vec![link] } else { vec![] }))
            .collect();
        let section = builder
            .create_markup_section(SectionTag::P, leaves, Default::default())
            .unwrap();
        let root = post.root();
        post.append(root, section).unwrap();
        section
    }

    #[test]
    fn test_extend_sets_direction() {
        let mut post = Post::new();
        let section = single_section(&mut post, &[("abcdef", false)]);
        let cursor = Range::collapsed(Position::new(&post, section, 3).unwrap());

        let forward = cursor.extend(&post, 2);
        assert_eq!((forward.head.offset(), forward.tail.offset()), (3, 5));
        assert_eq!(forward.direction, Some(Direction::Forward));

        let backward = cursor.extend(&post, -2);
        assert_eq!((backward.head.offset(), backward.tail.offset()), (1, 3));
        assert_eq!(backward.direction, Some(Direction::Backward));
        assert_eq!(backward.anchor().offset(), 3);

        // Shrinking a forward selection past its anchor flips it
        let flipped = forward.extend(&post, -3);
        assert_eq!((flipped.head.offset(), flipped.tail.offset()), (2, 3));
        assert_eq!(flipped.direction, Some(Direction::Backward));
    }

    #[test]
    fn test_expand_by_marker_covers_link() {
        let mut post = Post::new();
        let section = single_section(&mut post, &[("see ", false), ("the", true), (" docs", true), ("!", false)]);
        let inside = Range::collapsed(Position::new(&post, section, 6).unwrap());

        let expanded = inside
            .expand_by_marker(&post, |leaf| !leaf.markups().is_empty())
            .unwrap();
        assert_eq!((expanded.head.offset(), expanded.tail.offset()), (4, 12));
    }

    #[test]
    fn test_expand_by_marker_rejects_multi_section() {
        let mut post = Post::new();
        let first = single_section(&mut post, &[("a", false)]);
        let second = single_section(&mut post, &[("b", false)]);
        let range = Range::create(&post, first, 0, second, 1, None).unwrap();

        assert_eq!(
            range.expand_by_marker(&post, |_| true),
            Err(ModelError::RangeSpansSections)
        );
    }
}
