//! Operations on markerable sections (markup sections and list items) and
//! on list sections, expressed as methods on [`Post`] because they create
//! and relink arena nodes.

use crate::error::{ModelError, ModelResult};
use crate::leaf::{Leaf, Markuperable};
use crate::linked_list::LinkedStore;
use crate::markup::MarkupId;
use crate::node::{NodeId, NodeKind};
use crate::post::Post;
use tracing::trace;

/// Leaves added and removed by a marker split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerEdit {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// The seam left behind by a join: the last leaf that was already there and
/// the first leaf that was brought in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSeam {
    pub before_marker: Option<NodeId>,
    pub after_marker: Option<NodeId>,
}

/// A leaf touched by a section-local offset range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSlice {
    pub leaf: NodeId,
    /// Start of the covered part, relative to the leaf
    pub head: usize,
    /// End of the covered part, relative to the leaf
    pub tail: usize,
    /// The range covers the whole leaf
    pub is_contained: bool,
}

/// One offset unit of a markerable section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionUnit {
    Text(u16),
    Atom,
}

impl Post {
    pub(crate) fn ensure_markerable(&self, section: NodeId) -> ModelResult<()> {
        if self.node(section)?.is_markerable() {
            Ok(())
        } else {
            Err(ModelError::NotMarkerable(section))
        }
    }

    /// The leaf containing `offset` and the offset inside it. At a boundary
    /// between two leaves the left one wins.
    pub fn marker_position_at_offset(
        &self,
        section: NodeId,
        offset: usize,
    ) -> ModelResult<Option<(NodeId, usize)>> {
        self.ensure_markerable(section)?;
        let mut current = 0;
        let mut last = None;
        for leaf in self.items(section) {
            let length = self.leaf(leaf)?.length();
            if current + length >= offset {
                return Ok(Some((leaf, offset - current)));
            }
            current += length;
            last = Some((leaf, length));
        }
        match last {
            Some(_) => Err(ModelError::out_of_bounds(offset, current)),
            None => Ok(None),
        }
    }

    /// Leaf ending exactly at `offset`; `None` at the section head.
    pub fn marker_before_offset(&self, section: NodeId, offset: usize) -> ModelResult<Option<NodeId>> {
        self.ensure_markerable(section)?;
        if offset == 0 {
            return Ok(None);
        }
        let mut current = 0;
        for leaf in self.items(section) {
            current += self.leaf(leaf)?.length();
            if current == offset {
                return Ok(Some(leaf));
            }
            if current > offset {
                return Err(ModelError::NotABoundary(offset));
            }
        }
        Err(ModelError::out_of_bounds(offset, current))
    }

    /// Section offset at which `leaf` starts.
    pub fn offset_of_marker(&self, section: NodeId, leaf: NodeId) -> ModelResult<usize> {
        let mut offset = 0;
        for item in self.items(section) {
            if item == leaf {
                return Ok(offset);
            }
            offset += self.leaf(item)?.length();
        }
        Err(ModelError::NodeNotFound(leaf))
    }

    /// Guarantee a leaf boundary at `offset`.
    ///
    /// A section without leaves gets one blank marker; an offset inside a
    /// leaf splits it in place.
    pub fn split_marker_at_offset(&mut self, section: NodeId, offset: usize) -> ModelResult<MarkerEdit> {
        self.ensure_markerable(section)?;
        let mut edit = MarkerEdit::default();

        if self.is_empty(section) {
            if offset > 0 {
                return Err(ModelError::out_of_bounds(offset, 0));
            }
            let blank = self.builder().create_marker("", vec![]);
            self.append(section, blank)?;
            edit.added.push(blank);
            return Ok(edit);
        }

        let mut current = 0;
        for leaf in self.items(section) {
            if current == offset {
                return Ok(edit);
            }
            let length = self.leaf(leaf)?.length();
            if current + length > offset {
                let (pre, post) = self.leaf(leaf)?.split_at_offset(offset - current)?;
                let mut builder = self.builder();
                let pieces = vec![builder.create_leaf(pre), builder.create_leaf(post)];
                self.splice(section, leaf, 1, &pieces)?;
                trace!(%section, %leaf, offset, "split marker");
                edit.removed.push(leaf);
                edit.added = pieces;
                return Ok(edit);
            }
            current += length;
        }

        if current == offset {
            Ok(edit)
        } else {
            Err(ModelError::out_of_bounds(offset, current))
        }
    }

    /// Split a markerable section at `leaf` + `offset` into two new detached
    /// sections of the same kind. Leaves before the split point are copied
    /// into the first, the rest into the second.
    pub fn split_at_marker(
        &mut self,
        section: NodeId,
        leaf: Option<NodeId>,
        offset: usize,
    ) -> ModelResult<(NodeId, NodeId)> {
        self.ensure_markerable(section)?;
        let first = self.empty_like(section)?;
        let second = self.empty_like(section)?;

        let mut target = first;
        for child in self.items(section) {
            if Some(child) == leaf {
                let (pre, post) = self.leaf(child)?.split_at_offset(offset)?;
                let mut builder = self.builder();
                let pre = builder.create_leaf(pre);
                let post = builder.create_leaf(post);
                self.append(first, pre)?;
                self.append(second, post)?;
                target = second;
            } else {
                let copy = self.leaf(child)?.clone();
                let copy = self.builder().create_leaf(copy);
                self.append(target, copy)?;
            }
        }

        Ok((first, second))
    }

    /// Split a markerable section at a section offset.
    pub fn split_section_at_offset(&mut self, section: NodeId, offset: usize) -> ModelResult<(NodeId, NodeId)> {
        match self.marker_position_at_offset(section, offset)? {
            Some((leaf, leaf_offset)) => self.split_at_marker(section, Some(leaf), leaf_offset),
            None => self.split_at_marker(section, None, 0),
        }
    }

    /// A detached empty section of the same kind, tag and attributes.
    fn empty_like(&mut self, section: NodeId) -> ModelResult<NodeId> {
        let kind = match &self.node(section)?.kind {
            NodeKind::MarkupSection(markup_section) => NodeKind::MarkupSection(markup_section.clone()),
            NodeKind::ListItem(item) => NodeKind::ListItem(item.clone()),
            _ => return Err(ModelError::NotMarkerable(section)),
        };
        Ok(self.push_node(kind))
    }

    /// Merge `other` into `target`.
    ///
    /// A markerable target gains copies of `other`'s non-blank leaves. A list
    /// target gains new items: one per item of a list `other`, or a single
    /// item wrapping a markerable `other`.
    pub fn join(&mut self, target: NodeId, other: NodeId) -> ModelResult<JoinSeam> {
        let target_node = self.node(target)?;
        let (is_markerable, is_list) = (target_node.is_markerable(), target_node.is_list_section());
        if is_markerable {
            self.ensure_markerable(other)?;
            let before_marker = self.last(target);
            let mut after_marker = None;
            for leaf in self.items(other) {
                let source = self.leaf(leaf)?;
                if source.is_blank() {
                    continue;
                }
                let copy = source.clone();
                let copy = self.builder().create_leaf(copy);
                self.append(target, copy)?;
                after_marker.get_or_insert(copy);
            }
            return Ok(JoinSeam {
                before_marker,
                after_marker,
            });
        }

        if is_list {
            let other_node = self.node(other)?;
            let sources = if other_node.is_list_section() {
                self.items(other)
            } else if other_node.is_markerable() {
                vec![other]
            } else {
                return Err(ModelError::NotMarkerable(other));
            };

            let mut seam = JoinSeam::default();
            for source in sources {
                let item = self.builder().create_list_item(vec![])?;
                let item_seam = self.join(item, source)?;
                self.append(target, item)?;
                seam.after_marker = seam.after_marker.or(item_seam.after_marker);
            }
            return Ok(seam);
        }

        Err(ModelError::NotMarkerable(target))
    }

    /// Leaves touched by the section-local `head..tail` range.
    ///
    /// A collapsed range reports no leaves. Leaves ending at `head` or
    /// starting at `tail` are excluded unless blank.
    pub fn markers_in_range(&self, section: NodeId, head: usize, tail: usize) -> ModelResult<Vec<LeafSlice>> {
        self.ensure_markerable(section)?;
        let mut slices = Vec::new();
        if head > tail {
            return Err(ModelError::out_of_bounds(head, tail));
        }
        if head == tail {
            return Ok(slices);
        }

        let mut current = 0;
        for leaf in self.items(section) {
            let length = self.leaf(leaf)?.length();
            let leaf_head = current;
            let leaf_tail = current + length;
            current = leaf_tail;

            if leaf_tail < head || leaf_head > tail {
                continue;
            }
            if length > 0 && (leaf_tail == head || leaf_head == tail) {
                continue;
            }

            let slice_head = head.max(leaf_head) - leaf_head;
            let slice_tail = tail.min(leaf_tail) - leaf_head;
            slices.push(LeafSlice {
                leaf,
                head: slice_head,
                tail: slice_tail,
                is_contained: slice_head == 0 && slice_tail == length,
            });
        }
        Ok(slices)
    }

    /// Copies of the leaves covering `head..tail`, partial markers sliced.
    pub fn markers_for(&self, section: NodeId, head: usize, tail: usize) -> ModelResult<Vec<Leaf>> {
        let mut leaves = Vec::new();
        for slice in self.markers_in_range(section, head, tail)? {
            let leaf = self.leaf(slice.leaf)?;
            let copy = match leaf {
                Leaf::Marker(marker) if !slice.is_contained => Leaf::Marker(marker.slice(slice.head, slice.tail)?),
                _ => leaf.clone(),
            };
            leaves.push(copy);
        }
        Ok(leaves)
    }

    /// Union of markups over the leaves covering `head..tail`.
    pub fn section_markups_in_range(&self, section: NodeId, head: usize, tail: usize) -> ModelResult<Vec<MarkupId>> {
        let mut markups = Vec::new();
        for slice in self.markers_in_range(section, head, tail)? {
            for markup in self.leaf(slice.leaf)?.markups() {
                if !markups.contains(markup) {
                    markups.push(*markup);
                }
            }
        }
        Ok(markups)
    }

    /// The section's content as offset units.
    pub fn section_units(&self, section: NodeId) -> ModelResult<Vec<SectionUnit>> {
        self.ensure_markerable(section)?;
        let mut units = Vec::new();
        for leaf in self.items(section) {
            match self.leaf(leaf)? {
                Leaf::Marker(marker) => units.extend(marker.value().iter().map(|u| SectionUnit::Text(*u))),
                Leaf::Atom(_) => units.push(SectionUnit::Atom),
            }
        }
        Ok(units)
    }

    /// The UTF-16 code unit at a section offset, `None` for atoms and
    /// offsets past the end.
    pub fn code_unit_at(&self, section: NodeId, offset: usize) -> Option<u16> {
        let mut current = 0;
        for leaf in self.items(section) {
            let leaf = self.n(leaf).as_leaf()?;
            let length = leaf.length();
            if offset < current + length {
                return leaf.as_marker().and_then(|m| m.code_unit_at(offset - current));
            }
            current += length;
        }
        None
    }

    /// Merge adjacent joinable markers and drop blank ones (keeping one
    /// marker if the section would otherwise be empty). Returns whether
    /// anything changed.
    pub fn coalesce_markers(&mut self, section: NodeId) -> ModelResult<bool> {
        self.ensure_markerable(section)?;
        let mut changed = false;

        for leaf in self.items(section) {
            if self.leaf(leaf)?.is_blank() && self.len(section) > 1 {
                self.remove(section, leaf)?;
                changed = true;
            }
        }

        let mut current = self.first(section);
        while let Some(leaf) = current {
            let next = self.next(leaf);
            if let Some(next_leaf) = next {
                if self.leaf(leaf)?.can_join(self.leaf(next_leaf)?) {
                    let units = self
                        .leaf(next_leaf)?
                        .as_marker()
                        .map(|m| m.value().to_vec())
                        .unwrap_or_default();
                    if let Some(marker) = self.leaf_mut(leaf)?.as_marker_mut() {
                        marker.append_value(&units);
                    }
                    self.mark_dirty(leaf);
                    self.remove(section, next_leaf)?;
                    changed = true;
                    continue;
                }
            }
            current = next;
        }

        Ok(changed)
    }
}
