//! # Post Editor
//!
//! A mutation session over a [`Post`]. Every structural change to a
//! document goes through one.
//!
//! ## Lifecycle
//!
//! ```text
//! PostEditor::new(post, range)
//!     → structural calls (each returns the next cursor Position)
//!     → complete()
//!         1. BeforeComplete queue (list pruning and joining)
//!         2. coalesce touched markerables, keep the post non-empty
//!         3. Complete queue
//!         4. AfterComplete queue
//! ```
//!
//! A session that fails halfway leaves the tree as far as it got; nothing
//! is rolled back.

mod callbacks;
mod markups;
mod sections;
mod text;

pub use callbacks::{Callback, Queue};
pub use sections::has_block_tag;
pub use text::DeleteUnit;

use crate::errors::{EditorError, EditorResult};
use crate::history::EditAction;
use callbacks::{CallbackQueues, Deferred};
use folio_model::{Builder, LinkedStore, NodeId, Position, Post, Range, SectionTag};
use tracing::{debug, trace};

/// What a completed session hands back to its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub range: Range,
    pub edit_action: Option<EditAction>,
    pub cancel_snapshot: bool,
}

pub struct PostEditor<'a> {
    post: &'a mut Post,
    range: Range,
    default_tag: SectionTag,
    queues: CallbackQueues,
    /// Markerables to coalesce at completion
    touched: Vec<NodeId>,
    edit_action: Option<EditAction>,
    cancel_snapshot: bool,
    did_complete: bool,
}

impl<'a> PostEditor<'a> {
    /// Begin a session; `range` is the selection the session starts from.
    pub fn new(post: &'a mut Post, range: Range) -> Self {
        trace!(?range, "Session begin");
        Self {
            post,
            range,
            default_tag: SectionTag::default(),
            queues: CallbackQueues::default(),
            touched: Vec::new(),
            edit_action: None,
            cancel_snapshot: false,
            did_complete: false,
        }
    }

    /// Tag used for paragraphs the session synthesizes.
    pub fn with_default_tag(mut self, tag: SectionTag) -> Self {
        self.default_tag = tag;
        self
    }

    pub fn post(&self) -> &Post {
        self.post
    }

    pub fn builder(&mut self) -> Builder<'_> {
        self.post.builder()
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }

    pub fn set_position(&mut self, position: Position) {
        self.range = Range::collapsed(position);
    }

    pub fn edit_action(&self) -> Option<EditAction> {
        self.edit_action
    }

    /// Keep this session out of the undo history.
    pub fn cancel_snapshot(&mut self) {
        self.cancel_snapshot = true;
    }

    pub fn is_completed(&self) -> bool {
        self.did_complete
    }

    /// Run `callback` with the finished post when `queue` is flushed.
    pub fn schedule(&mut self, queue: Queue, callback: impl FnOnce(&Post) + 'static) -> EditorResult<()> {
        self.ensure_open()?;
        self.queues.push(queue, Deferred::Callback(Box::new(callback)));
        Ok(())
    }

    /// Flush the callback queues and hand the final state back.
    pub fn complete(&mut self) -> EditorResult<Completion> {
        if self.did_complete {
            return Err(EditorError::SessionCompleted);
        }

        self.flush(Queue::BeforeComplete)?;
        self.coalesce_touched()?;
        self.ensure_post_has_section()?;
        self.ensure_range_attached();
        self.did_complete = true;

        debug!(
            complete = self.queues.len(Queue::Complete),
            after_complete = self.queues.len(Queue::AfterComplete),
            action = ?self.edit_action,
            "Session complete"
        );
        self.flush(Queue::Complete)?;
        self.flush(Queue::AfterComplete)?;

        Ok(Completion {
            range: self.range,
            edit_action: self.edit_action,
            cancel_snapshot: self.cancel_snapshot,
        })
    }

    fn ensure_open(&self) -> EditorResult<()> {
        if self.did_complete {
            Err(EditorError::ScheduleAfterComplete)
        } else {
            Ok(())
        }
    }

    pub(crate) fn defer(&mut self, queue: Queue, deferred: Deferred) -> EditorResult<()> {
        self.ensure_open()?;
        self.queues.push(queue, deferred);
        Ok(())
    }

    pub(crate) fn defer_list_join(&mut self) -> EditorResult<()> {
        self.ensure_open()?;
        self.queues.push_join_once(Queue::BeforeComplete);
        Ok(())
    }

    fn flush(&mut self, queue: Queue) -> EditorResult<()> {
        loop {
            let entries = self.queues.take(queue);
            if entries.is_empty() {
                return Ok(());
            }
            for entry in entries {
                match entry {
                    Deferred::PruneIfBlank(list) => self.prune_if_blank(list)?,
                    Deferred::JoinContiguousLists => self.join_contiguous_lists()?,
                    Deferred::Callback(callback) => callback(&*self.post),
                }
            }
        }
    }

    /// Remember a markerable whose leaves changed.
    pub(crate) fn touch(&mut self, section: NodeId) {
        if !self.touched.contains(&section) {
            self.touched.push(section);
        }
    }

    fn coalesce_touched(&mut self) -> EditorResult<()> {
        for section in std::mem::take(&mut self.touched) {
            if self.post.is_attached(section) && self.post.node(section)?.is_markerable() {
                self.post.coalesce_markers(section)?;
            }
        }
        Ok(())
    }

    fn ensure_post_has_section(&mut self) -> EditorResult<()> {
        if !self.post.is_post_blank() {
            return Ok(());
        }
        let section = self.create_blank_section()?;
        let root = self.post.root();
        self.post.append(root, section)?;
        self.set_position(Position::new(self.post(), section, 0)?);
        debug!(%section, "Post emptied, added a blank section");
        Ok(())
    }

    /// Fall back to the end of the post when an operation left the range
    /// pointing at detached sections.
    fn ensure_range_attached(&mut self) {
        let attached = |position: Position| {
            position.is_blank()
                || position
                    .section()
                    .is_some_and(|section| self.post.is_attached(section) && position.offset() <= self.post.length(section))
        };
        if !(attached(self.range.head) && attached(self.range.tail)) {
            trace!(range = ?self.range, "Range detached, moving to post tail");
            self.range = Range::collapsed(self.post.tail_position());
        }
    }

    fn prune_if_blank(&mut self, list: NodeId) -> EditorResult<()> {
        if self.post.is_attached(list) && self.post.is_blank(list) {
            self.remove_section(list)?;
        }
        Ok(())
    }

    /// Merge runs of adjacent top-level lists with the same tag into the
    /// first list of each run. Items move, so positions inside them stay
    /// valid.
    fn join_contiguous_lists(&mut self) -> EditorResult<()> {
        let root = self.post.root();
        let mut base: Option<NodeId> = None;
        for section in self.post.sections() {
            let tag = self.post.node(section)?.as_list_section().map(|list| list.tag);
            let base_tag = base.and_then(|b| self.post.node(b).ok()?.as_list_section().map(|list| list.tag));
            match (base, tag) {
                (Some(target), Some(tag)) if base_tag == Some(tag) => {
                    for item in self.post.items(section) {
                        self.post.remove(section, item)?;
                        self.post.append(target, item)?;
                    }
                    self.post.remove(root, section)?;
                    trace!(%target, merged = %section, "Joined lists");
                }
                (_, Some(_)) => base = Some(section),
                (_, None) => base = None,
            }
        }
        Ok(())
    }

    pub(crate) fn create_blank_section(&mut self) -> EditorResult<NodeId> {
        let tag = self.default_tag;
        Ok(self
            .post
            .builder()
            .create_markup_section(tag, vec![], Default::default())?)
    }

    pub(crate) fn set_edit_action(&mut self, action: EditAction) {
        self.edit_action = Some(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{ListTag, SectionTag};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn paragraph(post: &mut Post, text: &str) -> NodeId {
        let mut builder = post.builder();
        let marker = builder.create_marker(text, vec![]);
        let section = builder
            .create_markup_section(SectionTag::P, vec![marker], Default::default())
            .unwrap();
        let root = post.root();
        post.append(root, section).unwrap();
        section
    }

    fn list(post: &mut Post, tag: ListTag, texts: &[&str]) -> NodeId {
        let mut items = Vec::new();
        for text in texts {
            let mut builder = post.builder();
            let marker = builder.create_marker(text, vec![]);
            items.push(builder.create_list_item(vec![marker]).unwrap());
        }
        let list = post
            .builder()
            .create_list_section(tag, items, Default::default())
            .unwrap();
        let root = post.root();
        post.append(root, list).unwrap();
        list
    }

    #[test]
    fn test_complete_runs_queues_in_order() {
        let mut post = Post::new();
        paragraph(&mut post, "hi");
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut editor = PostEditor::new(&mut post, Range::blank());
        for (queue, name) in [
            (Queue::AfterComplete, "after"),
            (Queue::Complete, "complete"),
            (Queue::BeforeComplete, "before"),
        ] {
            let log = Rc::clone(&log);
            editor.schedule(queue, move |_| log.borrow_mut().push(name)).unwrap();
        }
        editor.complete().unwrap();

        assert_eq!(*log.borrow(), vec!["before", "complete", "after"]);
    }

    #[test]
    fn test_double_complete_and_late_schedule_fail() {
        let mut post = Post::new();
        paragraph(&mut post, "hi");
        let mut editor = PostEditor::new(&mut post, Range::blank());
        editor.complete().unwrap();

        assert!(matches!(editor.complete(), Err(EditorError::SessionCompleted)));
        assert!(matches!(
            editor.schedule(Queue::Complete, |_| {}),
            Err(EditorError::ScheduleAfterComplete)
        ));
    }

    #[test]
    fn test_emptied_post_gets_blank_section() {
        let mut post = Post::new();
        let section = paragraph(&mut post, "bye");
        let mut editor = PostEditor::new(&mut post, Range::blank()).with_default_tag(SectionTag::H2);
        editor.remove_section(section).unwrap();
        let completion = editor.complete().unwrap();

        let sections = post.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(post.node(sections[0]).unwrap().tag_name(), Some("h2"));
        assert_eq!(completion.range.head.section(), Some(sections[0]));
    }

    #[test]
    fn test_join_contiguous_lists_keeps_items() {
        let mut post = Post::new();
        let first = list(&mut post, ListTag::Ul, &["a"]);
        let second = list(&mut post, ListTag::Ul, &["b", "c"]);
        let third = list(&mut post, ListTag::Ol, &["d"]);
        let moved = post.children(second)[0];

        let mut editor = PostEditor::new(&mut post, Range::blank());
        editor.join_contiguous_lists().unwrap();
        editor.complete().unwrap();

        assert_eq!(post.sections(), vec![first, third]);
        assert_eq!(post.children(first).len(), 3);
        assert_eq!(post.parent(moved), Some(first));
    }
}
