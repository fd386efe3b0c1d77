//! Markup operations over ranges.

use super::PostEditor;
use crate::errors::EditorResult;
use folio_model::{Markup, MarkupId, MarkupTag, Markuperable, Range};
use tracing::trace;

impl PostEditor<'_> {
    /// Remove markups with `tag` from `range` when any covered leaf has one,
    /// otherwise add `markup`.
    pub fn toggle_markup(&mut self, markup: MarkupId, range: Range) -> EditorResult<()> {
        let tag = self.post.markup(markup)?.tag();
        let present = self
            .post
            .markups_in_range(&range)?
            .into_iter()
            .any(|m| self.post.markup(m).is_ok_and(|found| found.has_tag(tag)));

        if present {
            self.remove_markups_matching(range, |found| found.has_tag(tag))?;
        } else {
            self.add_markup_to_range(range, markup)?;
        }
        self.set_range(range);
        Ok(())
    }

    /// [`Self::toggle_markup`] for an attribute-less markup.
    pub fn toggle_markup_tag(&mut self, tag: MarkupTag, range: Range) -> EditorResult<()> {
        let markup = self.post.builder().create_markup(tag, vec![]);
        self.toggle_markup(markup, range)
    }

    /// Add `markup` to every leaf covered by `range`.
    ///
    /// The markup goes in just after the markups every covered leaf already
    /// shares, so the serialized open/close stacks around it stay stable.
    pub fn add_markup_to_range(&mut self, range: Range, markup: MarkupId) -> EditorResult<()> {
        if range.is_collapsed() {
            return Ok(());
        }
        let markers = self.split_markers(range)?;
        let Some(first) = markers.first() else {
            return Ok(());
        };

        let mut shared = self.post.leaf(*first)?.markups().to_vec();
        for marker in &markers[1..] {
            let markups = self.post.leaf(*marker)?.markups();
            shared.retain(|m| markups.contains(m));
        }
        let index = shared.len();

        for marker in &markers {
            self.post.leaf_mut(*marker)?.add_markup_at_index(markup, index);
            self.post.mark_dirty(*marker);
        }
        trace!(?range, %markup, index, leaves = markers.len(), "Added markup");
        Ok(())
    }

    pub fn remove_markup_from_range(&mut self, range: Range, markup: MarkupId) -> EditorResult<()> {
        self.strip_markups(range, |id, _| id == markup)
    }

    /// Remove every markup satisfying `predicate` from the leaves covered
    /// by `range`.
    pub fn remove_markups_matching(&mut self, range: Range, predicate: impl Fn(&Markup) -> bool) -> EditorResult<()> {
        self.strip_markups(range, |_, markup| predicate(markup))
    }

    fn strip_markups(&mut self, range: Range, predicate: impl Fn(MarkupId, &Markup) -> bool) -> EditorResult<()> {
        if range.is_collapsed() {
            return Ok(());
        }
        for marker in self.split_markers(range)? {
            let mut doomed = Vec::new();
            for id in self.post.leaf(marker)?.markups() {
                if predicate(*id, self.post.markup(*id)?) {
                    doomed.push(*id);
                }
            }
            if doomed.is_empty() {
                continue;
            }
            let leaf = self.post.leaf_mut(marker)?;
            for id in doomed {
                leaf.remove_markup(id);
            }
            self.post.mark_dirty(marker);
        }
        Ok(())
    }
}
