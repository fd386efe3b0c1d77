//! # Replayable Edits
//!
//! Serializable editing commands, so a sequence of edits can be stored as
//! JSON and replayed against a document.
//!
//! ## Design Principles
//!
//! 1. **Addressed by index**: a [`Point`] names a leaf section by its
//!    document-order index, so scripts stay valid across a reload
//! 2. **Validated**: every point is resolved before anything is mutated
//! 3. **Session-backed**: each edit runs as one editor session and lands in
//!    the undo history like an interactive edit
//!
//! ## Script format
//!
//! ```json
//! [
//!   { "type": "insertText", "at": { "section": 0, "offset": 5 }, "text": "!" },
//!   { "type": "toggleMarkup", "head": { "section": 0, "offset": 0 },
//!     "tail": { "section": 0, "offset": 5 }, "tag": "strong" },
//!   { "type": "undo" }
//! ]
//! ```

use crate::editor::Editor;
use crate::errors::EditorResult;
use crate::post_editor::DeleteUnit;
use folio_model::{BlockTag, CardMode, Direction, MarkupTag, Position, Post, Range};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

/// A cursor location: leaf section index plus offset inside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub section: usize,
    pub offset: usize,
}

impl Point {
    pub fn new(section: usize, offset: usize) -> Self {
        Self { section, offset }
    }

    pub fn resolve(&self, post: &Post) -> Result<Position, EditError> {
        Position::from_leaf_index(post, self.section, self.offset).map_err(|_| EditError::PointOutOfBounds(*self))
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.section, self.offset)
    }
}

/// Editing commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Edit {
    /// Insert text at a point
    InsertText { at: Point, text: String },

    /// Delete everything between two points
    DeleteRange { head: Point, tail: Point },

    /// Delete one character or word next to a point
    Delete {
        at: Point,
        direction: Direction,
        #[serde(default)]
        unit: DeleteUnit,
    },

    /// Split the section at a point
    SplitSection { at: Point },

    /// Toggle a markup over a range
    ToggleMarkup {
        head: Point,
        tail: Point,
        tag: MarkupTag,
        #[serde(default)]
        attributes: Vec<(String, String)>,
    },

    /// Toggle the block tag of every section in a range
    ToggleSection { head: Point, tail: Point, tag: BlockTag },

    /// Insert an inline atom at a point
    InsertAtom {
        at: Point,
        name: String,
        value: String,
        #[serde(default)]
        payload: Value,
    },

    /// Insert a card section at a point
    InsertCard {
        at: Point,
        name: String,
        #[serde(default)]
        payload: Value,
    },

    /// Set `data-md-<key>` on every section in a range
    SetAttribute {
        head: Point,
        tail: Point,
        key: String,
        value: String,
    },

    /// Move the top-level section containing a point up (backward) or
    /// down (forward)
    MoveSection { at: Point, direction: Direction },

    Undo,

    Redo,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Point out of bounds: {0}")]
    PointOutOfBounds(Point),

    #[error("Range head {head} is after its tail {tail}")]
    InvertedRange { head: Point, tail: Point },

    #[error("Section {0} does not hold text")]
    NotMarkerable(usize),
}

impl Edit {
    /// Apply the edit to `editor` with validation
    pub fn apply(&self, editor: &mut Editor) -> EditorResult<()> {
        self.validate(editor.post())?;
        debug!(edit = self.name(), "Applying edit");

        match self {
            Edit::InsertText { at, text } => {
                editor.set_position(at.resolve(editor.post())?);
                editor.insert_text(text)?;
            }

            Edit::DeleteRange { head, tail } => {
                let range = Self::range(editor.post(), head, tail)?;
                editor.run(|pe| pe.delete_range(range))?;
            }

            Edit::Delete { at, direction, unit } => {
                let position = at.resolve(editor.post())?;
                editor.run(|pe| pe.delete_at_position(position, *direction, *unit))?;
            }

            Edit::SplitSection { at } => {
                let position = at.resolve(editor.post())?;
                editor.run(|pe| {
                    let next = pe.split_section(position)?;
                    pe.set_position(next);
                    Ok(())
                })?;
            }

            Edit::ToggleMarkup { head, tail, tag, attributes } => {
                let range = Self::range(editor.post(), head, tail)?;
                editor.run(|pe| {
                    let markup = pe.builder().create_markup(*tag, attributes.clone());
                    pe.toggle_markup(markup, range)
                })?;
            }

            Edit::ToggleSection { head, tail, tag } => {
                let range = Self::range(editor.post(), head, tail)?;
                editor.run(|pe| pe.toggle_section(*tag, range))?;
            }

            Edit::InsertAtom { at, name, value, payload } => {
                let position = at.resolve(editor.post())?;
                editor.run(|pe| pe.insert_atom(position, name, value, payload.clone()))?;
            }

            Edit::InsertCard { at, name, payload } => {
                editor.set_position(at.resolve(editor.post())?);
                editor.run(|pe| {
                    let card = pe.builder().create_card(name.as_str(), payload.clone(), CardMode::Display);
                    pe.insert_section(card)
                })?;
            }

            Edit::SetAttribute { head, tail, key, value } => {
                let range = Self::range(editor.post(), head, tail)?;
                editor.run(|pe| pe.set_attribute(key, value, range))?;
            }

            Edit::MoveSection { at, direction } => {
                let position = at.resolve(editor.post())?;
                let section = match position.section() {
                    Some(section) => editor.post().top_level_section(section),
                    None => return Err(EditError::PointOutOfBounds(*at).into()),
                };
                editor.run(|pe| {
                    match direction {
                        Direction::Backward => pe.move_section_up(section)?,
                        Direction::Forward => pe.move_section_down(section)?,
                    };
                    pe.set_position(position);
                    Ok(())
                })?;
            }

            Edit::Undo => {
                editor.undo()?;
            }

            Edit::Redo => {
                editor.redo()?;
            }
        }
        Ok(())
    }

    /// Check that every point resolves against `post`
    pub fn validate(&self, post: &Post) -> Result<(), EditError> {
        match self {
            Edit::InsertText { at, .. } | Edit::InsertAtom { at, .. } => {
                let position = at.resolve(post)?;
                if !position.is_markerable(post) {
                    return Err(EditError::NotMarkerable(at.section));
                }
                Ok(())
            }

            Edit::Delete { at, .. } | Edit::SplitSection { at } | Edit::InsertCard { at, .. } | Edit::MoveSection { at, .. } => {
                at.resolve(post).map(|_| ())
            }

            Edit::DeleteRange { head, tail }
            | Edit::ToggleMarkup { head, tail, .. }
            | Edit::ToggleSection { head, tail, .. }
            | Edit::SetAttribute { head, tail, .. } => Self::range(post, head, tail).map(|_| ()),

            Edit::Undo | Edit::Redo => Ok(()),
        }
    }

    fn range(post: &Post, head: &Point, tail: &Point) -> Result<Range, EditError> {
        let (from, to) = (head.resolve(post)?, tail.resolve(post)?);
        if from.compare(post, &to) == Ordering::Greater {
            return Err(EditError::InvertedRange { head: *head, tail: *tail });
        }
        Ok(Range::new(from, to, None))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Edit::InsertText { .. } => "insertText",
            Edit::DeleteRange { .. } => "deleteRange",
            Edit::Delete { .. } => "delete",
            Edit::SplitSection { .. } => "splitSection",
            Edit::ToggleMarkup { .. } => "toggleMarkup",
            Edit::ToggleSection { .. } => "toggleSection",
            Edit::InsertAtom { .. } => "insertAtom",
            Edit::InsertCard { .. } => "insertCard",
            Edit::SetAttribute { .. } => "setAttribute",
            Edit::MoveSection { .. } => "moveSection",
            Edit::Undo => "undo",
            Edit::Redo => "redo",
        }
    }
}

/// Parse a JSON array of edits.
pub fn parse_script(json: &str) -> EditorResult<Vec<Edit>> {
    Ok(serde_json::from_str(json)?)
}

/// Apply `edits` in order, stopping at the first failure.
pub fn replay(editor: &mut Editor, edits: &[Edit]) -> EditorResult<()> {
    for (index, edit) in edits.iter().enumerate() {
        edit.apply(editor).inspect_err(|e| {
            tracing::warn!(index, edit = edit.name(), error = %e, "Edit failed");
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use folio_model::{ListTag, SectionTag};

    fn editor_with(text: &str) -> Editor {
        let mut editor = Editor::new(EditorConfig::default()).unwrap();
        editor.insert_text(text).unwrap();
        editor
    }

    fn texts(editor: &Editor) -> Vec<String> {
        editor
            .post()
            .sections()
            .into_iter()
            .map(|section| editor.post().text(section))
            .collect()
    }

    #[test]
    fn test_parse_script() {
        let edits = parse_script(
            r#"[
                { "type": "insertText", "at": { "section": 0, "offset": 0 }, "text": "hi" },
                { "type": "delete", "at": { "section": 0, "offset": 2 }, "direction": "backward" },
                { "type": "toggleSection", "head": { "section": 0, "offset": 0 },
                  "tail": { "section": 0, "offset": 1 }, "tag": "ol" },
                { "type": "undo" }
            ]"#,
        )
        .unwrap();

        assert_eq!(edits.len(), 4);
        assert_eq!(
            edits[1],
            Edit::Delete {
                at: Point::new(0, 2),
                direction: Direction::Backward,
                unit: DeleteUnit::Char,
            }
        );
        assert!(matches!(
            edits[2],
            Edit::ToggleSection { tag: BlockTag::List(ListTag::Ol), .. }
        ));
        assert_eq!(edits[3], Edit::Undo);
    }

    #[test]
    fn test_validate_rejects_bad_points() {
        let editor = editor_with("abc");
        let post = editor.post();

        let out_of_section = Edit::SplitSection { at: Point::new(3, 0) };
        assert_eq!(
            out_of_section.validate(post),
            Err(EditError::PointOutOfBounds(Point::new(3, 0)))
        );

        let past_end = Edit::InsertText { at: Point::new(0, 4), text: "x".into() };
        assert!(past_end.validate(post).is_err());

        let inverted = Edit::DeleteRange { head: Point::new(0, 2), tail: Point::new(0, 1) };
        assert!(matches!(inverted.validate(post), Err(EditError::InvertedRange { .. })));
    }

    #[test]
    fn test_failed_validation_leaves_post_alone() {
        let mut editor = editor_with("abc");
        let version = editor.version();
        let edit = Edit::DeleteRange { head: Point::new(0, 0), tail: Point::new(0, 9) };
        assert!(editor.apply(&edit).is_err());
        assert_eq!(texts(&editor), vec!["abc".to_string()]);
        assert_eq!(editor.version(), version);
    }

    #[test]
    fn test_replay_script() {
        let mut editor = editor_with("Hello world");
        let edits = vec![
            Edit::SplitSection { at: Point::new(0, 5) },
            Edit::Delete { at: Point::new(1, 1), direction: Direction::Backward, unit: DeleteUnit::Char },
            Edit::ToggleSection {
                head: Point::new(0, 0),
                tail: Point::new(0, 0),
                tag: BlockTag::Section(SectionTag::H1),
            },
            Edit::InsertText { at: Point::new(0, 5), text: "!".into() },
        ];

        replay(&mut editor, &edits).unwrap();
        assert_eq!(texts(&editor), vec!["Hello!".to_string(), "world".to_string()]);
        let heading = editor.post().sections()[0];
        assert!(crate::post_editor::has_block_tag(
            editor.post(),
            heading,
            BlockTag::Section(SectionTag::H1)
        ));

        replay(&mut editor, &[Edit::Undo]).unwrap();
        assert_eq!(texts(&editor), vec!["Hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn test_move_section_and_insert_card() {
        let mut editor = editor_with("one");
        let edits = vec![
            Edit::SplitSection { at: Point::new(0, 3) },
            Edit::InsertText { at: Point::new(1, 0), text: "two".into() },
            Edit::MoveSection { at: Point::new(1, 1), direction: Direction::Backward },
            Edit::InsertCard { at: Point::new(1, 3), name: "image".into(), payload: Value::Null },
        ];
        replay(&mut editor, &edits).unwrap();

        let sections = editor.post().sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(editor.post().text(sections[0]), "two");
        assert_eq!(editor.post().text(sections[1]), "one");
        assert!(editor.post().node(sections[2]).unwrap().is_card());
    }
}
