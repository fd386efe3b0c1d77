//! # Editor
//!
//! Owns a [`Post`], the cursor range and the [`EditHistory`], and runs every
//! change through a [`PostEditor`] session.
//!
//! ## Session flow
//!
//! ```text
//! run(|pe| ...)
//!     → refresh pending snapshot range
//!     → PostEditor session → complete()
//!     → render (will_render / render / did_render)
//!     → did_update_post listeners
//!     → store snapshot (pending cleared first when cancelled)
//!     → version += 1
//! ```

use crate::config::EditorConfig;
use crate::edits::Edit;
use crate::errors::EditorResult;
use crate::history::EditHistory;
use crate::post_editor::{DeleteUnit, PostEditor};
use crate::render::Renderer;
use chrono::{DateTime, Utc};
use folio_model::{
    parser, serializer, BlockTag, Direction, LinkedStore, MarkupId, MarkupTag, Position, Post, Range,
    SerializedPost,
};
use std::path::Path;
use tracing::{debug, info};

type Clock = Box<dyn Fn() -> DateTime<Utc>>;
type Listener = Box<dyn FnMut(&Post)>;

pub struct Editor {
    post: Post,
    range: Range,
    history: EditHistory,
    config: EditorConfig,
    renderer: Option<Box<dyn Renderer>>,
    clock: Clock,
    listeners: Vec<Listener>,

    /// Markups toggled at a collapsed cursor, used by the next insertion
    typing_markups: Option<Vec<MarkupId>>,

    /// Incremented on each completed session
    version: u64,
}

impl Editor {
    /// Start from a post holding one blank paragraph.
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        let mut post = Post::new();
        let mut builder = post.builder();
        let section = builder.create_markup_section(config.default_section_tag, vec![], Default::default())?;
        let root = post.root();
        post.append(root, section)?;
        Self::from_post(post, config)
    }

    pub fn from_post(mut post: Post, config: EditorConfig) -> EditorResult<Self> {
        // Loading is not a session; `render_all` draws the initial post
        post.take_render_work();
        let range = Range::collapsed(post.head_position());
        let mut editor = Self {
            post,
            range,
            history: EditHistory::from_config(&config),
            config,
            renderer: None,
            clock: Box::new(Utc::now),
            listeners: Vec::new(),
            typing_markups: None,
            version: 0,
        };
        editor.store_initial_snapshot()?;
        Ok(editor)
    }

    pub fn from_serialized(doc: &SerializedPost, config: EditorConfig) -> EditorResult<Self> {
        Self::from_post(parser::parse(doc)?, config)
    }

    /// Open a document with the `folio.config.json` found in `dir`.
    pub fn load_config(dir: impl AsRef<Path>, doc: &SerializedPost) -> EditorResult<Self> {
        let config = EditorConfig::load(dir)?;
        Self::from_serialized(doc, config)
    }

    /// Replace the wall clock used to timestamp snapshots.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> EditorResult<Self> {
        self.clock = Box::new(clock);
        self.history.clear();
        self.store_initial_snapshot()?;
        Ok(self)
    }

    fn store_initial_snapshot(&mut self) -> EditorResult<()> {
        let now = (self.clock)();
        self.history.store_snapshot(&self.post, self.range, None, now)
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = range;
        self.typing_markups = None;
    }

    pub fn set_position(&mut self, position: Position) {
        self.set_range(Range::collapsed(position));
    }

    pub fn set_renderer(&mut self, renderer: impl Renderer + 'static) {
        self.renderer = Some(Box::new(renderer));
    }

    pub fn take_renderer(&mut self) -> Option<Box<dyn Renderer>> {
        self.renderer.take()
    }

    /// Draw the whole post with the attached renderer.
    pub fn render_all(&mut self) -> EditorResult<()> {
        for section in self.post.sections() {
            self.post.mark_dirty(section);
        }
        self.render()
    }

    /// Register a `did_update_post` listener.
    pub fn on_update(&mut self, listener: impl FnMut(&Post) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Run `callback` in a new session and settle the result.
    pub fn run<T>(&mut self, callback: impl FnOnce(&mut PostEditor<'_>) -> EditorResult<T>) -> EditorResult<T> {
        self.session(|editor, _, _| callback(editor))
    }

    fn session<T>(
        &mut self,
        callback: impl FnOnce(&mut PostEditor<'_>, &mut EditHistory, DateTime<Utc>) -> EditorResult<T>,
    ) -> EditorResult<T> {
        let now = (self.clock)();
        self.history.refresh_pending_range(&self.post, self.range);

        let mut editor = PostEditor::new(&mut self.post, self.range).with_default_tag(self.config.default_section_tag);
        let value = callback(&mut editor, &mut self.history, now)?;
        let completion = editor.complete()?;

        if completion.range != self.range {
            self.typing_markups = None;
        }
        self.range = completion.range;
        self.render()?;
        for listener in &mut self.listeners {
            listener(&self.post);
        }

        if completion.cancel_snapshot {
            self.history.clear_pending();
        }
        self.history
            .store_snapshot(&self.post, self.range, completion.edit_action, now)?;
        self.version += 1;

        debug!(version = self.version, action = ?completion.edit_action, "Post updated");
        Ok(value)
    }

    fn render(&mut self) -> EditorResult<()> {
        let work = self.post.take_render_work();
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        if work.is_empty() {
            return Ok(());
        }
        renderer.will_render();
        let result = renderer.render(&self.post, &work);
        renderer.did_render();
        result
    }

    /// Step back one history entry. Returns whether anything changed.
    pub fn undo(&mut self) -> EditorResult<bool> {
        let stepped = self.session(|editor, history, now| {
            let stepped = history.step_backward(editor, now)?;
            if !stepped {
                editor.cancel_snapshot();
            }
            Ok(stepped)
        })?;
        info!(stepped, "Undo");
        Ok(stepped)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let stepped = self.session(|editor, history, now| {
            let stepped = history.step_forward(editor, now)?;
            if !stepped {
                editor.cancel_snapshot();
            }
            Ok(stepped)
        })?;
        info!(stepped, "Redo");
        Ok(stepped)
    }

    /// Type `text` over the selection.
    pub fn insert_text(&mut self, text: &str) -> EditorResult<Position> {
        let range = self.range;
        let typing = self.typing_markups.clone();
        let next = self.run(|editor| {
            let position = if range.is_collapsed() {
                range.head
            } else {
                editor.delete_range(range)?
            };
            match typing {
                Some(markups) => editor.insert_text_with_markups(position, text, markups),
                None => editor.insert_text(position, text),
            }
        })?;
        self.typing_markups = None;
        Ok(next)
    }

    /// Delete the selection, or one `unit` in `direction` from a collapsed
    /// cursor.
    pub fn delete_selection(&mut self, direction: Direction, unit: DeleteUnit) -> EditorResult<Position> {
        let range = self.range;
        self.run(|editor| {
            if range.is_collapsed() {
                editor.delete_at_position(range.head, direction, unit)
            } else {
                editor.delete_range(range)
            }
        })
    }

    /// Split the section at the cursor, deleting the selection first.
    pub fn insert_newline(&mut self) -> EditorResult<Position> {
        let range = self.range;
        self.run(|editor| {
            let position = if range.is_collapsed() {
                range.head
            } else {
                editor.delete_range(range)?
            };
            let next = editor.split_section(position)?;
            editor.set_position(next);
            Ok(next)
        })
    }

    /// Toggle `tag` over the selection. At a collapsed cursor the toggle
    /// applies to the next text typed there.
    pub fn toggle_markup(&mut self, tag: MarkupTag, attributes: Vec<(String, String)>) -> EditorResult<()> {
        let range = self.range;
        if range.is_collapsed() {
            let mut markups = self.active_markups()?;
            let before = markups.len();
            let post = &self.post;
            markups.retain(|m| !post.markup(*m).is_ok_and(|markup| markup.has_tag(tag)));
            if markups.len() == before {
                markups.push(self.post.builder().create_markup(tag, attributes));
            }
            self.typing_markups = Some(markups);
            return Ok(());
        }

        self.run(|editor| {
            let markup = editor.builder().create_markup(tag, attributes);
            editor.toggle_markup(markup, range)
        })
    }

    pub fn toggle_section(&mut self, tag: BlockTag) -> EditorResult<Range> {
        let range = self.range;
        self.run(|editor| editor.toggle_section(tag, range))
    }

    /// Markups that apply at the cursor, or across the selection.
    pub fn active_markups(&self) -> EditorResult<Vec<MarkupId>> {
        if let Some(markups) = &self.typing_markups {
            return Ok(markups.clone());
        }
        Ok(self.post.markups_in_range(&self.range)?)
    }

    pub fn has_active_markup(&self, tag: MarkupTag) -> EditorResult<bool> {
        Ok(self
            .active_markups()?
            .into_iter()
            .any(|m| self.post.markup(m).is_ok_and(|markup| markup.has_tag(tag))))
    }

    pub fn serialize(&self) -> EditorResult<SerializedPost> {
        Ok(serializer::serialize(&self.post, self.config.serialization_version)?)
    }

    pub fn apply(&mut self, edit: &Edit) -> EditorResult<()> {
        edit.apply(self)
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("range", &self.range)
            .field("version", &self.version)
            .field("history", &self.history)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
