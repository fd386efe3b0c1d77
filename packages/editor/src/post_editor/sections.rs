//! Section-level structure: inserting, removing, splitting and retagging.

use super::callbacks::Deferred;
use super::{PostEditor, Queue};
use crate::errors::EditorResult;
use folio_model::{BlockTag, LinkedStore, ModelError, NodeId, Position, Post, Range};
use tracing::{debug, trace};

impl PostEditor<'_> {
    /// Detach `section` from its parent. A list left empty by this is
    /// pruned before completion.
    pub fn remove_section(&mut self, section: NodeId) -> EditorResult<()> {
        let parent = self.post.parent(section).ok_or(ModelError::NodeNotFound(section))?;
        self.post.remove(parent, section)?;
        if self.post.node(parent)?.is_list_section() {
            self.defer(Queue::BeforeComplete, Deferred::PruneIfBlank(parent))?;
        }
        trace!(%section, %parent, "Removed section");
        Ok(())
    }

    /// Put `new` where `section` is and detach `section`.
    pub fn replace_section(&mut self, section: NodeId, new: NodeId) -> EditorResult<()> {
        self.replace_section_with(section, &[new])
    }

    fn replace_section_with(&mut self, section: NodeId, sections: &[NodeId]) -> EditorResult<()> {
        let parent = self.post.parent(section).ok_or(ModelError::NodeNotFound(section))?;
        let leaves_list = match sections.first() {
            Some(first) => self.post.node(*first)?.is_markup_section() && self.post.node(section)?.is_list_item(),
            None => false,
        };

        // A paragraph cannot live inside a list; it goes after the list.
        let (collection, reference) = if leaves_list {
            let grandparent = self.post.parent(parent).ok_or(ModelError::NodeNotFound(parent))?;
            (grandparent, self.post.next(parent))
        } else {
            (parent, self.post.next(section))
        };

        for new in sections {
            self.insert_section_before(collection, *new, reference)?;
        }
        self.remove_section(section)
    }

    /// Insert `section` into `collection` before `reference`, or at the end.
    pub fn insert_section_before(
        &mut self,
        collection: NodeId,
        section: NodeId,
        reference: Option<NodeId>,
    ) -> EditorResult<()> {
        self.post.insert_before(collection, section, reference)?;
        self.post.mark_dirty(section);
        Ok(())
    }

    pub fn insert_section_at_end(&mut self, section: NodeId) -> EditorResult<()> {
        let root = self.post.root();
        self.insert_section_before(root, section, None)
    }

    /// Insert a detached top-level section at the session's cursor.
    ///
    /// A blank section under the cursor is replaced; a cursor inside text
    /// splits the section around the insertion; a cursor inside a list
    /// inserts after the list.
    pub fn insert_section(&mut self, section: NodeId) -> EditorResult<Position> {
        let position = self.range.head;
        let root = self.post.root();

        match position.section() {
            None => self.insert_section_at_end(section)?,
            Some(current) if self.post.is_nested(current) => {
                let list = self.post.top_level_section(current);
                let reference = self.post.next(list);
                self.insert_section_before(root, section, reference)?;
            }
            Some(current) if self.post.is_blank(current) => self.replace_section(current, section)?,
            Some(current) => {
                let markerable = self.post.node(current)?.is_markerable();
                if markerable && position.is_head() {
                    self.insert_section_before(root, section, Some(current))?;
                } else if !markerable || position.is_tail(self.post()) {
                    let reference = self.post.next(current);
                    self.insert_section_before(root, section, reference)?;
                } else {
                    let after = self.split_section(position)?;
                    self.insert_section_before(root, section, after.section())?;
                }
            }
        }

        let next = Position::tail_of(self.post(), section);
        self.set_position(next);
        Ok(next)
    }

    /// Split the section under `position` in two and return the head of the
    /// second half.
    pub fn split_section(&mut self, position: Position) -> EditorResult<Position> {
        let section = position.section().ok_or(ModelError::BlankPosition)?;
        let node = self.post.node(section)?;
        let is_atomic = node.is_card() || node.is_image();
        let is_blank_last_item =
            node.is_list_item() && self.post.next(section).is_none() && self.post.is_blank(section);

        let next = if is_atomic {
            self.split_atomic_section(section, position.offset())?
        } else if is_blank_last_item {
            self.leave_list(section)?
        } else {
            let (first, second) = self.post.split_section_at_offset(section, position.offset())?;
            self.touch(first);
            self.touch(second);
            self.replace_section_with(section, &[first, second])?;
            Position::head_of(self.post(), second)
        };

        trace!(%section, offset = position.offset(), ?next, "Split section");
        self.set_position(next);
        Ok(next)
    }

    /// Cards and images never split: a blank paragraph goes in before or
    /// after them.
    fn split_atomic_section(&mut self, section: NodeId, offset: usize) -> EditorResult<Position> {
        let parent = self.post.parent(section).ok_or(ModelError::NodeNotFound(section))?;
        let blank = self.create_blank_section()?;
        if offset == 0 {
            self.insert_section_before(parent, blank, Some(section))?;
            Ok(Position::head_of(self.post(), section))
        } else {
            let reference = self.post.next(section);
            self.insert_section_before(parent, blank, reference)?;
            Ok(Position::head_of(self.post(), blank))
        }
    }

    /// Enter on a blank last item drops it and continues in a paragraph
    /// after the list.
    fn leave_list(&mut self, item: NodeId) -> EditorResult<Position> {
        let list = self.post.parent(item).ok_or(ModelError::NotAListItem(item))?;
        let collection = self.post.parent(list).ok_or(ModelError::NodeNotFound(list))?;
        let blank = self.create_blank_section()?;
        let reference = self.post.next(list);
        self.remove_section(item)?;
        self.insert_section_before(collection, blank, reference)?;
        Ok(Position::head_of(self.post(), blank))
    }

    /// Split `list` into `[prev, mid, next]` where `mid` holds exactly
    /// `item`. Items before it move into `prev`; the rest stay behind in
    /// `list`, which becomes `next`. Blank `prev`/`next` lists are pruned
    /// before completion.
    pub fn split_list_at_item(&mut self, list: NodeId, item: NodeId) -> EditorResult<[NodeId; 3]> {
        let (tag, attributes) = self
            .post
            .node(list)?
            .as_list_section()
            .map(|section| (section.tag, section.attributes.clone()))
            .ok_or(ModelError::NotAListSection(list))?;
        if self.post.parent(item) != Some(list) {
            return Err(ModelError::NotAListItem(item).into());
        }
        let collection = self.post.parent(list).ok_or(ModelError::NodeNotFound(list))?;

        let mut builder = self.post.builder();
        let prev = builder.create_list_section(tag, vec![], attributes.clone())?;
        let mid = builder.create_list_section(tag, vec![], attributes)?;
        self.insert_section_before(collection, prev, Some(list))?;
        self.insert_section_before(collection, mid, Some(list))?;

        for current in self.post.items(list) {
            self.post.remove(list, current)?;
            if current == item {
                self.post.append(mid, current)?;
                break;
            }
            self.post.append(prev, current)?;
        }

        self.defer(Queue::BeforeComplete, Deferred::PruneIfBlank(prev))?;
        self.defer(Queue::BeforeComplete, Deferred::PruneIfBlank(list))?;
        trace!(%list, %item, %prev, %mid, "Split list");
        Ok([prev, mid, list])
    }

    /// Retag every markerable section in `range`.
    ///
    /// When all of them already carry `tag` they go back to the default
    /// paragraph tag instead. The cursor range follows the converted
    /// sections; when either end turned into a list it collapses to the
    /// head of the first converted section.
    pub fn toggle_section(&mut self, tag: BlockTag, range: Range) -> EditorResult<Range> {
        let mut sections = Vec::new();
        self.post.walk_markerable_sections(&range, |section| sections.push(section));
        if sections.is_empty() {
            self.set_range(range);
            return Ok(range);
        }

        let every_has_tag = sections.iter().all(|section| has_block_tag(self.post(), *section, tag));
        let target = if every_has_tag {
            BlockTag::Section(self.default_tag)
        } else {
            tag
        };

        let mut transforms = Vec::with_capacity(sections.len());
        for section in sections {
            let changed = self.change_section_tag_name(section, target)?;
            transforms.push((section, changed));
        }

        let changed = |end: Option<NodeId>| {
            transforms
                .iter()
                .find(|(from, _)| Some(*from) == end)
                .map(|(_, to)| *to)
        };
        let first = transforms[0].1;
        let next = match (changed(range.head.section()), changed(range.tail.section())) {
            (Some(head), Some(tail))
                if !self.post.node(head)?.is_list_section() && !self.post.node(tail)?.is_list_section() =>
            {
                Range::create(
                    self.post(),
                    head,
                    range.head.offset(),
                    tail,
                    range.tail.offset(),
                    range.direction,
                )?
            }
            _ => Range::collapsed(Position::head_of(self.post(), first)),
        };

        debug!(tag = %target, sections = transforms.len(), "Toggled section");
        self.set_range(next);
        Ok(next)
    }

    /// Give `section` a new block tag and return the section now standing in
    /// for it. Conversions into or out of lists build a new section.
    pub fn change_section_tag_name(&mut self, section: NodeId, tag: BlockTag) -> EditorResult<NodeId> {
        let node = self.post.node(section)?;
        let is_list_item = node.is_list_item();

        match tag {
            BlockTag::List(list_tag) => {
                let changed = if is_list_item {
                    let list = self.post.parent(section).ok_or(ModelError::NotAListItem(section))?;
                    if has_block_tag(self.post(), section, tag) {
                        return Ok(section);
                    }
                    let [_, mid, _] = self.split_list_at_item(list, section)?;
                    self.post.set_list_tag(mid, list_tag)?;
                    mid
                } else {
                    let list = self.post.builder().create_list_section(list_tag, vec![], Default::default())?;
                    self.post.join(list, section)?;
                    self.replace_section(section, list)?;
                    list
                };
                self.defer_list_join()?;
                Ok(changed)
            }
            BlockTag::Section(section_tag) if is_list_item => {
                let list = self.post.parent(section).ok_or(ModelError::NotAListItem(section))?;
                let markup_section =
                    self.post
                        .builder()
                        .create_markup_section(section_tag, vec![], Default::default())?;
                self.post.join(markup_section, section)?;
                let [_, mid, _] = self.split_list_at_item(list, section)?;
                self.replace_section(mid, markup_section)?;
                Ok(markup_section)
            }
            BlockTag::Section(section_tag) => {
                self.post.set_section_tag(section, section_tag)?;
                Ok(section)
            }
        }
    }

    /// Paste `source` at `position`. The leaves of a leading paragraph merge
    /// into the section under the cursor; the remaining sections are copied
    /// in after it.
    pub fn insert_post(&mut self, position: Position, source: &Post) -> EditorResult<Position> {
        let sections = source.sections();
        let root = self.post.root();
        let mut position = position;
        let mut rest = sections.as_slice();

        if let Some(first) = sections.first() {
            if source.node(*first)?.is_markup_section() && position.is_markerable(self.post()) {
                let mut leaves = Vec::new();
                for leaf in source.items(*first) {
                    let imported = self.post.import_leaf(source, source.leaf(leaf)?)?;
                    leaves.push(self.post.builder().create_leaf(imported));
                }
                position = self.insert_markers(position, leaves)?;
                rest = &sections[1..];
            }
        }
        if rest.is_empty() {
            return Ok(position);
        }

        let reference = match position.section() {
            None => None,
            Some(current) if self.post.is_nested(current) => {
                let list = self.post.top_level_section(current);
                self.post.next(list)
            }
            Some(current) => {
                let markerable = self.post.node(current)?.is_markerable();
                if markerable && position.is_head() && !self.post.is_blank(current) {
                    Some(current)
                } else if markerable && !position.is_tail(self.post()) {
                    self.split_section(position)?.section()
                } else {
                    self.post.next(current)
                }
            }
        };

        let mut last = None;
        for section in rest {
            let imported = self.post.import_section(source, *section)?;
            self.insert_section_before(root, imported, reference)?;
            last = Some(imported);
        }

        let next = match last {
            Some(section) => Position::tail_of(self.post(), section),
            None => position,
        };
        debug!(sections = sections.len(), "Pasted post");
        self.set_position(next);
        Ok(next)
    }

    pub fn remove_all_sections(&mut self) -> EditorResult<()> {
        for section in self.post.sections() {
            self.remove_section(section)?;
        }
        Ok(())
    }

    /// Append detached sections (typically fresh from the parser).
    pub fn migrate_sections(&mut self, sections: Vec<NodeId>) -> EditorResult<()> {
        for section in sections {
            self.insert_section_at_end(section)?;
        }
        Ok(())
    }

    /// Set `data-md-<key>` on every section in `range`. List items pass the
    /// attribute to their list.
    pub fn set_attribute(&mut self, key: &str, value: &str, range: Range) -> EditorResult<()> {
        let attribute = format!("data-md-{key}");
        for section in self.attribute_targets(range) {
            self.post.set_section_attribute(section, &attribute, value)?;
        }
        self.set_range(range);
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str, range: Range) -> EditorResult<()> {
        let attribute = format!("data-md-{key}");
        for section in self.attribute_targets(range) {
            self.post.remove_section_attribute(section, &attribute)?;
        }
        self.set_range(range);
        Ok(())
    }

    fn attribute_targets(&self, range: Range) -> Vec<NodeId> {
        let mut targets = Vec::new();
        self.post.walk_markerable_sections(&range, |section| {
            let target = if self.post.is_nested(section) {
                self.post.parent(section).unwrap_or(section)
            } else {
                section
            };
            if !targets.contains(&target) {
                targets.push(target);
            }
        });
        targets
    }

    /// Swap `section` with its previous sibling. The section keeps its
    /// identity.
    pub fn move_section_up(&mut self, section: NodeId) -> EditorResult<NodeId> {
        let Some(prev) = self.post.prev(section) else {
            return Ok(section);
        };
        let parent = self.post.parent(section).ok_or(ModelError::NodeNotFound(section))?;
        self.post.remove(parent, section)?;
        self.insert_section_before(parent, section, Some(prev))?;
        Ok(section)
    }

    pub fn move_section_down(&mut self, section: NodeId) -> EditorResult<NodeId> {
        let Some(next) = self.post.next(section) else {
            return Ok(section);
        };
        let parent = self.post.parent(section).ok_or(ModelError::NodeNotFound(section))?;
        let reference = self.post.next(next);
        self.post.remove(parent, section)?;
        self.insert_section_before(parent, section, reference)?;
        Ok(section)
    }
}

/// Does `section` already render with `tag`? List items answer for their
/// list.
pub fn has_block_tag(post: &Post, section: NodeId, tag: BlockTag) -> bool {
    let owner = if post.is_nested(section) {
        post.parent(section).unwrap_or(section)
    } else {
        section
    };
    let Ok(node) = post.node(owner) else {
        return false;
    };
    match tag {
        BlockTag::Section(tag) => node.as_markup_section().is_some_and(|s| s.tag == tag),
        BlockTag::List(tag) => node.as_list_section().is_some_and(|l| l.tag == tag),
    }
}
