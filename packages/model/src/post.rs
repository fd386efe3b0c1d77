//! # Post
//!
//! The root document aggregate. A post owns an arena of [`Node`]s (sections
//! and leaves) and a table of [`Markup`]s; everything else in the crate
//! addresses them by handle.
//!
//! ## Structure
//!
//! ```text
//! Post (root node)
//! ├── MarkupSection ── Marker, Atom, ...
//! ├── ListSection
//! │   ├── ListItem ── Marker, ...
//! │   └── ListItem ── ...
//! ├── Card
//! └── Image
//! ```
//!
//! ## Rendering contract
//!
//! Every membership change dirties the owning node and its ancestors, and
//! every detach of a rendered node queues it for removal. A renderer drains
//! both through [`Post::take_render_work`], which walks only dirty subtrees.

use crate::builder::Builder;
use crate::error::{ModelError, ModelResult};
use crate::leaf::{Leaf, Marker, Markuperable};
use crate::linked_list::{Link, LinkedStore, ListHead};
use crate::markup::{Markup, MarkupId, MarkupTag};
use crate::node::{Node, NodeId, NodeKind};
use crate::position::{Direction, Position};
use crate::range::Range;
use crate::section::{ListTag, SectionTag};
use std::collections::HashMap;

/// Nodes a renderer has to (re)draw or drop after a batch of edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderWork {
    /// Dirty attached nodes, parents before children
    pub dirty: Vec<NodeId>,
    /// Previously rendered nodes that were detached
    pub removed: Vec<NodeId>,
}

impl RenderWork {
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    nodes: Vec<Node>,
    markups: Vec<Markup>,
    markup_cache: HashMap<MarkupTag, MarkupId>,
    root: NodeId,
    removals: Vec<NodeId>,
}

impl Default for Post {
    fn default() -> Self {
        Self::new()
    }
}

impl Post {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Post)],
            markups: Vec::new(),
            markup_cache: HashMap::new(),
            root: NodeId(0),
            removals: Vec::new(),
        }
    }

    /// The factory for every node and markup of this post.
    pub fn builder(&mut self) -> Builder<'_> {
        Builder::new(self)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ----- arena access -----

    pub(crate) fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    pub(crate) fn n(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn n_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node(&self, id: NodeId) -> ModelResult<&Node> {
        self.nodes.get(id.index()).ok_or(ModelError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> ModelResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(ModelError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub(crate) fn push_markup(&mut self, markup: Markup) -> MarkupId {
        let id = MarkupId(self.markups.len() as u32);
        self.markups.push(markup);
        id
    }

    pub(crate) fn cached_markup(&self, tag: MarkupTag) -> Option<MarkupId> {
        self.markup_cache.get(&tag).copied()
    }

    pub(crate) fn cache_markup(&mut self, tag: MarkupTag, id: MarkupId) {
        self.markup_cache.insert(tag, id);
    }

    pub fn markup(&self, id: MarkupId) -> ModelResult<&Markup> {
        self.markups
            .get(id.index())
            .ok_or_else(|| ModelError::malformed(format!("unknown {}", id)))
    }

    pub fn leaf(&self, id: NodeId) -> ModelResult<&Leaf> {
        self.node(id)?.as_leaf().ok_or(ModelError::NotALeaf(id))
    }

    pub fn leaf_mut(&mut self, id: NodeId) -> ModelResult<&mut Leaf> {
        self.node_mut(id)?
            .as_leaf_mut()
            .ok_or(ModelError::NotALeaf(id))
    }

    pub fn marker(&self, id: NodeId) -> Option<&Marker> {
        self.node(id).ok().and_then(Node::as_marker)
    }

    // ----- tree shape -----

    /// Top-level sections in order.
    pub fn sections(&self) -> Vec<NodeId> {
        self.items(self.root)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.items(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.n(id).link.parent
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.n(id).link.next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.n(id).link.prev
    }

    /// A list item inside its list.
    pub fn is_nested(&self, id: NodeId) -> bool {
        self.parent(id)
            .is_some_and(|parent| self.n(parent).is_list_section())
    }

    /// Is `id` reachable from the root?
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    /// Length in offset units: text length for markerables, 1 for cards and
    /// images, 0 for containers.
    pub fn length(&self, section: NodeId) -> usize {
        let node = self.n(section);
        if node.is_markerable() {
            self.items(section)
                .into_iter()
                .filter_map(|leaf| self.n(leaf).as_leaf())
                .map(Markuperable::length)
                .sum()
        } else if node.is_card() || node.is_image() {
            1
        } else if node.is_leaf() {
            node.as_leaf().map_or(0, Markuperable::length)
        } else {
            0
        }
    }

    pub fn is_blank(&self, id: NodeId) -> bool {
        let node = self.n(id);
        match &node.kind {
            NodeKind::MarkupSection(_) | NodeKind::ListItem(_) => self
                .items(id)
                .into_iter()
                .all(|leaf| self.n(leaf).as_leaf().map_or(true, Markuperable::is_blank)),
            NodeKind::ListSection(_) | NodeKind::Post => self.is_empty(id),
            NodeKind::Card(_) | NodeKind::Image(_) => false,
            NodeKind::Leaf(leaf) => leaf.is_blank(),
        }
    }

    pub fn is_post_blank(&self) -> bool {
        self.is_empty(self.root)
    }

    /// More than one section, or one non-blank section.
    pub fn has_content(&self) -> bool {
        let sections = self.sections();
        sections.len() > 1 || sections.first().is_some_and(|s| !self.is_blank(*s))
    }

    /// Concatenated text of a section's leaves (atoms contribute their value).
    pub fn text(&self, section: NodeId) -> String {
        let node = self.n(section);
        if node.is_list_section() {
            return self
                .items(section)
                .into_iter()
                .map(|item| self.text(item))
                .collect::<Vec<_>>()
                .join("\n");
        }
        self.items(section)
            .into_iter()
            .filter_map(|leaf| self.n(leaf).as_leaf())
            .map(Markuperable::text)
            .collect()
    }

    // ----- render bookkeeping -----

    /// Dirty `id` and every ancestor.
    pub fn mark_dirty(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.n_mut(node).dirty = true;
            current = self.parent(node);
        }
    }

    /// Queue a rendered node for removal; the subtree must be drawn again
    /// if it is ever reattached.
    pub fn schedule_removal(&mut self, id: NodeId) {
        if self.n(id).rendered {
            self.removals.push(id);
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let entry = self.n_mut(node);
            entry.rendered = false;
            entry.dirty = true;
            stack.extend(self.items(node));
        }
    }

    /// Drain pending render work: scheduled removals plus a top-down scan of
    /// dirty attached nodes. Scanned nodes become clean and rendered.
    pub fn take_render_work(&mut self) -> RenderWork {
        let removed = std::mem::take(&mut self.removals);
        let mut dirty = Vec::new();

        if self.n(self.root).dirty {
            let mut stack = vec![self.root];
            while let Some(node) = stack.pop() {
                let children = self.items(node);
                for child in children.into_iter().rev() {
                    if self.n(child).dirty {
                        stack.push(child);
                    }
                }
                let entry = self.n_mut(node);
                entry.dirty = false;
                entry.rendered = true;
                if node != self.root {
                    dirty.push(node);
                }
            }
        }

        RenderWork { dirty, removed }
    }

    // ----- section properties -----

    pub fn set_section_tag(&mut self, section: NodeId, tag: SectionTag) -> ModelResult<()> {
        match &mut self.node_mut(section)?.kind {
            NodeKind::MarkupSection(markup_section) => markup_section.tag = tag,
            _ => return Err(ModelError::InvalidSectionTag(tag.as_str().to_string())),
        }
        self.mark_dirty(section);
        Ok(())
    }

    pub fn set_list_tag(&mut self, list: NodeId, tag: ListTag) -> ModelResult<()> {
        match &mut self.node_mut(list)?.kind {
            NodeKind::ListSection(list_section) => list_section.tag = tag,
            _ => return Err(ModelError::NotAListSection(list)),
        }
        self.mark_dirty(list);
        Ok(())
    }

    /// Set a whitelisted attribute. Returns whether the value changed.
    pub fn set_section_attribute(&mut self, section: NodeId, name: &str, value: &str) -> ModelResult<bool> {
        let attributable = self
            .node_mut(section)?
            .attributable_mut()
            .ok_or_else(|| ModelError::InvalidAttribute(name.to_string()))?;
        if attributable.attribute(name) == Some(value) {
            return Ok(false);
        }
        attributable.set_attribute(name, value)?;
        self.mark_dirty(section);
        Ok(true)
    }

    pub fn remove_section_attribute(&mut self, section: NodeId, name: &str) -> ModelResult<bool> {
        let removed = self
            .node_mut(section)?
            .attributable_mut()
            .is_some_and(|attributable| attributable.remove_attribute(name));
        if removed {
            self.mark_dirty(section);
        }
        Ok(removed)
    }

    // ----- leaf-section traversal -----

    /// First leaf section at or inside `section`.
    pub fn first_leaf_section(&self, section: NodeId) -> Option<NodeId> {
        let node = self.n(section);
        if node.is_list_section() {
            match self.first(section) {
                Some(item) => Some(item),
                None => self.next_leaf_section(section),
            }
        } else {
            Some(section)
        }
    }

    /// Following leaf section in document order, descending into lists and
    /// climbing out of them.
    pub fn next_leaf_section(&self, section: NodeId) -> Option<NodeId> {
        if let Some(next) = self.next(section) {
            if self.n(next).is_list_section() {
                return match self.first(next) {
                    Some(item) => Some(item),
                    None => self.next_leaf_section(next),
                };
            }
            return Some(next);
        }
        if self.is_nested(section) {
            return self.parent(section).and_then(|p| self.next_leaf_section(p));
        }
        None
    }

    pub fn previous_leaf_section(&self, section: NodeId) -> Option<NodeId> {
        if let Some(prev) = self.prev(section) {
            if self.n(prev).is_list_section() {
                return match self.last(prev) {
                    Some(item) => Some(item),
                    None => self.previous_leaf_section(prev),
                };
            }
            return Some(prev);
        }
        if self.is_nested(section) {
            return self
                .parent(section)
                .and_then(|p| self.previous_leaf_section(p));
        }
        None
    }

    /// Every leaf section from `range.head` through `range.tail` inclusive.
    pub fn leaf_sections_in_range(&self, range: &Range) -> Vec<NodeId> {
        let mut sections = Vec::new();
        let (Some(mut current), tail) = (range.head.section(), range.tail.section()) else {
            return sections;
        };
        loop {
            sections.push(current);
            if Some(current) == tail {
                break;
            }
            match self.next_leaf_section(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        sections
    }

    pub fn walk_leaf_sections(&self, range: &Range, mut callback: impl FnMut(NodeId)) {
        for section in self.leaf_sections_in_range(range) {
            callback(section);
        }
    }

    pub fn walk_markerable_sections(&self, range: &Range, mut callback: impl FnMut(NodeId)) {
        for section in self.leaf_sections_in_range(range) {
            if self.n(section).is_markerable() {
                callback(section);
            }
        }
    }

    pub fn leaf_sections(&self) -> Vec<NodeId> {
        let mut sections = Vec::new();
        let mut current = self.first(self.root).and_then(|s| self.first_leaf_section(s));
        while let Some(section) = current {
            sections.push(section);
            current = self.next_leaf_section(section);
        }
        sections
    }

    pub fn walk_all_leaf_sections(&self, mut callback: impl FnMut(NodeId)) {
        for section in self.leaf_sections() {
            callback(section);
        }
    }

    pub fn leaf_section_at_index(&self, index: usize) -> Option<NodeId> {
        self.leaf_sections().get(index).copied()
    }

    pub fn leaf_section_index(&self, section: NodeId) -> Option<usize> {
        self.leaf_sections().iter().position(|s| *s == section)
    }

    /// Top-level section holding `section` (itself unless nested in a list).
    pub fn top_level_section(&self, section: NodeId) -> NodeId {
        let mut current = section;
        while let Some(parent) = self.parent(current) {
            if parent == self.root {
                break;
            }
            current = parent;
        }
        current
    }

    /// Top-level sections lying strictly between the range's endpoints.
    pub fn sections_contained_by(&self, range: &Range) -> Vec<NodeId> {
        let (Some(head), Some(tail)) = (range.head.section(), range.tail.section()) else {
            return Vec::new();
        };
        let (head, tail) = (self.top_level_section(head), self.top_level_section(tail));
        let mut contained = Vec::new();
        if head == tail {
            return contained;
        }
        let mut current = self.next(head);
        while let Some(section) = current {
            if section == tail {
                break;
            }
            contained.push(section);
            current = self.next(section);
        }
        contained
    }

    pub fn head_position(&self) -> Position {
        match self.first(self.root) {
            Some(section) => Position::head_of(self, section),
            None => Position::blank(),
        }
    }

    pub fn tail_position(&self) -> Position {
        match self.last(self.root) {
            Some(section) => Position::tail_of(self, section),
            None => Position::blank(),
        }
    }

    /// Range covering the whole post.
    pub fn to_range(&self) -> Range {
        Range::new(self.head_position(), self.tail_position(), None)
    }

    // ----- markups -----

    /// Markups `leaf` opens relative to its previous sibling.
    pub fn opened_markups(&self, leaf: NodeId) -> ModelResult<Vec<MarkupId>> {
        let current = self.leaf(leaf)?;
        let prev = self.prev(leaf).and_then(|p| self.n(p).as_leaf());
        Ok(current
            .markups()
            .iter()
            .copied()
            .filter(|m| prev.map_or(true, |p| !p.has_markup(*m)))
            .collect())
    }

    /// Markups `leaf` closes relative to its next sibling, innermost first.
    pub fn closed_markups(&self, leaf: NodeId) -> ModelResult<Vec<MarkupId>> {
        let current = self.leaf(leaf)?;
        let next = self.next(leaf).and_then(|n| self.n(n).as_leaf());
        Ok(current
            .markups()
            .iter()
            .rev()
            .copied()
            .filter(|m| next.map_or(true, |n| !n.has_markup(*m)))
            .collect())
    }

    /// Markups active over `range`.
    ///
    /// For a collapsed range this is what typing at the cursor would
    /// produce: markups carried across from the left when forward-inclusive
    /// and from the right when backward-inclusive.
    pub fn markups_in_range(&self, range: &Range) -> ModelResult<Vec<MarkupId>> {
        let mut markups: Vec<MarkupId> = Vec::new();
        let add = |m: MarkupId, markups: &mut Vec<MarkupId>| {
            if !markups.contains(&m) {
                markups.push(m);
            }
        };

        if range.is_collapsed() {
            let position = range.head;
            if !position.is_markerable(self) {
                return Ok(markups);
            }
            let back = position.marker_in(self, Direction::Backward);
            let forward = position.marker_in(self, Direction::Forward);
            match (back, forward) {
                (Some(back), Some(forward)) if back == forward => {
                    for m in self.leaf(back)?.markups() {
                        add(*m, &mut markups);
                    }
                }
                _ => {
                    if let Some(back) = back {
                        for m in self.leaf(back)?.markups() {
                            if self.markup(*m)?.is_forward_inclusive() {
                                add(*m, &mut markups);
                            }
                        }
                    }
                    if let Some(forward) = forward {
                        for m in self.leaf(forward)?.markups() {
                            if self.markup(*m)?.is_backward_inclusive() {
                                add(*m, &mut markups);
                            }
                        }
                    }
                }
            }
        } else {
            for section in self.leaf_sections_in_range(range) {
                if !self.n(section).is_markerable() {
                    continue;
                }
                let trimmed = range.trim_to(self, section);
                for m in self.section_markups_in_range(
                    section,
                    trimmed.head.offset(),
                    trimmed.tail.offset(),
                )? {
                    add(m, &mut markups);
                }
            }
        }

        Ok(markups)
    }

    /// Leaves wholly covered by `range`, across sections.
    pub fn markers_contained_by_range(&self, range: &Range) -> ModelResult<Vec<NodeId>> {
        let mut markers = Vec::new();
        for section in self.leaf_sections_in_range(range) {
            if !self.n(section).is_markerable() {
                continue;
            }
            let trimmed = range.trim_to(self, section);
            for slice in self.markers_in_range(section, trimmed.head.offset(), trimmed.tail.offset())? {
                if slice.is_contained {
                    markers.push(slice.leaf);
                }
            }
        }
        Ok(markers)
    }

    // ----- copying -----

    /// Copy a leaf from another post, re-creating its markups here.
    pub fn import_leaf(&mut self, source: &Post, leaf: &Leaf) -> ModelResult<Leaf> {
        let mut copy = leaf.clone();
        let mut markups = Vec::with_capacity(leaf.markups().len());
        for id in leaf.markups() {
            let markup = source.markup(*id)?;
            markups.push(
                self.builder()
                    .create_markup(markup.tag(), markup.attributes().to_vec()),
            );
        }
        *copy.markups_mut() = markups;
        Ok(copy)
    }

    /// Deep-copy a detached or attached section subtree from another post.
    pub fn import_section(&mut self, source: &Post, section: NodeId) -> ModelResult<NodeId> {
        let node = source.node(section)?;
        let copy = match &node.kind {
            NodeKind::MarkupSection(markup_section) => {
                let leaves = self.import_leaves(source, section)?;
                let mut builder = self.builder();
                builder.create_markup_section(
                    markup_section.tag,
                    leaves,
                    markup_section.attributes.clone(),
                )?
            }
            NodeKind::ListItem(_) => {
                let leaves = self.import_leaves(source, section)?;
                self.builder().create_list_item(leaves)?
            }
            NodeKind::ListSection(list) => {
                let mut items = Vec::new();
                for item in source.items(section) {
                    items.push(self.import_section(source, item)?);
                }
                self.builder()
                    .create_list_section(list.tag, items, list.attributes.clone())?
            }
            NodeKind::Card(card) => self.builder().create_card_from(card.duplicate()),
            NodeKind::Image(image) => self.builder().create_image(image.src.clone()),
            NodeKind::Post | NodeKind::Leaf(_) => {
                return Err(ModelError::NotALeafSection(section));
            }
        };
        Ok(copy)
    }

    fn import_leaves(&mut self, source: &Post, section: NodeId) -> ModelResult<Vec<NodeId>> {
        let mut leaves = Vec::new();
        for leaf in source.items(section) {
            let imported = self.import_leaf(source, source.leaf(leaf)?)?;
            leaves.push(self.builder().create_leaf(imported));
        }
        Ok(leaves)
    }

    /// An independent post holding only the content covered by `range`.
    ///
    /// Partially covered markerable sections are truncated; list items are
    /// re-homed into a fresh list per source list.
    pub fn trim_to(&self, range: &Range) -> ModelResult<Post> {
        let mut post = Post::new();
        let root = post.root;
        let mut current_list: Option<(NodeId, NodeId)> = None;

        for section in self.leaf_sections_in_range(range) {
            let node = self.n(section);
            if node.is_markerable() {
                let trimmed = range.trim_to(self, section);
                let mut leaves = Vec::new();
                for leaf in self.markers_for(section, trimmed.head.offset(), trimmed.tail.offset())? {
                    let imported = post.import_leaf(self, &leaf)?;
                    leaves.push(post.builder().create_leaf(imported));
                }

                if node.is_list_item() {
                    let source_list = self.parent(section).ok_or(ModelError::NotAListItem(section))?;
                    let target_list = match current_list {
                        Some((source, target)) if source == source_list => target,
                        _ => {
                            let tag = self
                                .n(source_list)
                                .as_list_section()
                                .map(|l| l.tag)
                                .ok_or(ModelError::NotAListSection(source_list))?;
                            let list = post.builder().create_list_section(tag, vec![], Default::default())?;
                            post.append(root, list)?;
                            current_list = Some((source_list, list));
                            list
                        }
                    };
                    let item = post.builder().create_list_item(leaves)?;
                    post.append(target_list, item)?;
                } else {
                    current_list = None;
                    let (tag, attributes) = node
                        .as_markup_section()
                        .map(|s| (s.tag, s.attributes.clone()))
                        .ok_or(ModelError::NotMarkerable(section))?;
                    let copy = post.builder().create_markup_section(tag, leaves, attributes)?;
                    post.append(root, copy)?;
                }
            } else {
                current_list = None;
                let copy = post.import_section(self, section)?;
                post.append(root, copy)?;
            }
        }

        Ok(post)
    }
}

impl LinkedStore<NodeId> for Post {
    fn link(&self, item: NodeId) -> &Link<NodeId> {
        &self.n(item).link
    }

    fn link_mut(&mut self, item: NodeId) -> &mut Link<NodeId> {
        &mut self.n_mut(item).link
    }

    fn list(&self, owner: NodeId) -> &ListHead<NodeId> {
        &self.n(owner).children
    }

    fn list_mut(&mut self, owner: NodeId) -> &mut ListHead<NodeId> {
        &mut self.n_mut(owner).children
    }

    fn adopt(&mut self, owner: NodeId, _item: NodeId) {
        self.mark_dirty(owner);
    }

    fn free(&mut self, owner: NodeId, item: NodeId) {
        self.schedule_removal(item);
        self.mark_dirty(owner);
    }
}
