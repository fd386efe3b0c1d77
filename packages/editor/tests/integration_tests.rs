//! Integration tests for editor crate

use chrono::{DateTime, Utc};
use folio_editor::{
    edits, DeleteUnit, Edit, Editor, EditorConfig, HtmlRenderer, Point, PostEditor, Renderer,
};
use folio_model::{
    parser, serializer, BlockTag, Direction, FormatVersion, LinkedStore, ListTag, MarkupTag, Markuperable, NodeId,
    Position, Post, Range, RenderWork, SectionTag,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn paragraph(post: &mut Post, runs: &[(&str, &[MarkupTag])]) -> NodeId {
    let mut builder = post.builder();
    let mut leaves = Vec::new();
    for (text, tags) in runs {
        let markups = tags.iter().map(|tag| builder.create_markup(*tag, vec![])).collect();
        leaves.push(builder.create_marker(text, markups));
    }
    let section = builder
        .create_markup_section(SectionTag::P, leaves, Default::default())
        .unwrap();
    let root = post.root();
    post.append(root, section).unwrap();
    section
}

fn list(post: &mut Post, texts: &[&str]) -> (NodeId, Vec<NodeId>) {
    let mut items = Vec::new();
    for text in texts {
        let mut builder = post.builder();
        let marker = builder.create_marker(text, vec![]);
        items.push(builder.create_list_item(vec![marker]).unwrap());
    }
    let list = post
        .builder()
        .create_list_section(ListTag::Ul, items.clone(), Default::default())
        .unwrap();
    let root = post.root();
    post.append(root, list).unwrap();
    (list, items)
}

fn texts(post: &Post) -> Vec<String> {
    post.sections().into_iter().map(|section| post.text(section)).collect()
}

fn item_texts(post: &Post, list: NodeId) -> Vec<String> {
    post.items(list).into_iter().map(|item| post.text(item)).collect()
}

/// No markerable holds two neighbouring markers with the same markups.
fn assert_coalesced(post: &Post) {
    for section in post.leaf_sections() {
        let leaves = post.children(section);
        for pair in leaves.windows(2) {
            let (left, right) = (post.leaf(pair[0]).unwrap(), post.leaf(pair[1]).unwrap());
            if left.as_marker().is_some() && right.as_marker().is_some() {
                assert_ne!(left.markups(), right.markups(), "uncoalesced markers in {section}");
            }
        }
    }
}

fn stepping_clock() -> (Rc<Cell<i64>>, impl Fn() -> DateTime<Utc>) {
    let now = Rc::new(Cell::new(0));
    let clock = {
        let now = now.clone();
        move || DateTime::<Utc>::from_timestamp_millis(now.get()).unwrap()
    };
    (now, clock)
}

#[test]
fn test_delete_last_character() {
    let mut post = Post::new();
    let section = paragraph(&mut post, &[("Howdy!", &[])]);
    let range = Range::create(&post, section, 5, section, 6, None).unwrap();

    let mut editor = PostEditor::new(&mut post, range);
    let position = editor.delete_range(range).unwrap();
    editor.complete().unwrap();

    assert_eq!(post.text(section), "Howdy");
    assert_eq!(position.section(), Some(section));
    assert_eq!(position.offset(), 5);
}

#[test]
fn test_list_split_examples() {
    let mut post = Post::new();
    let (list, items) = list(&mut post, &["i1", "i2", "i3"]);

    let mut editor = PostEditor::new(&mut post, Range::blank());
    let [prev, mid, next] = editor.split_list_at_item(list, items[1]).unwrap();
    editor.complete().unwrap();
    assert_eq!(item_texts(&post, prev), vec!["i1"]);
    assert_eq!(item_texts(&post, mid), vec!["i2"]);
    assert_eq!(item_texts(&post, next), vec!["i3"]);

    let mut post = Post::new();
    let (list, items) = self::list(&mut post, &["i1", "i2", "i3"]);
    let mut editor = PostEditor::new(&mut post, Range::blank());
    let [prev, mid, next] = editor.split_list_at_item(list, items[0]).unwrap();
    editor.complete().unwrap();
    assert!(!post.is_attached(prev));
    assert_eq!(item_texts(&post, mid), vec!["i1"]);
    assert_eq!(item_texts(&post, next), vec!["i2", "i3"]);
    assert_eq!(post.sections(), vec![mid, next]);
}

#[test]
fn test_split_then_join_restores_markers() {
    let mut post = Post::new();
    let section = paragraph(&mut post, &[("bold", &[MarkupTag::B]), (" plain", &[])]);
    let before = serializer::serialize(&post, FormatVersion::V0_3_2).unwrap();
    let position = Position::new(&post, section, 4).unwrap();

    let mut editor = PostEditor::new(&mut post, Range::collapsed(position));
    let second = editor.split_section(position).unwrap();
    editor.complete().unwrap();
    assert_eq!(texts(&post), vec!["bold", " plain"]);

    let first = post.sections()[0];
    let second = second.section().unwrap();
    let range = Range::new(Position::tail_of(&post, first), Position::head_of(&post, second), None);
    let mut editor = PostEditor::new(&mut post, range);
    editor.delete_range(range).unwrap();
    editor.complete().unwrap();

    let after = serializer::serialize(&post, FormatVersion::V0_3_2).unwrap();
    assert_eq!(after, before);
}

#[test]
fn test_undo_redo_symmetry() {
    let (now, clock) = stepping_clock();
    let config = EditorConfig {
        undo_depth: 0,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(config).unwrap().with_clock(clock).unwrap();

    let mut states = vec![editor.serialize().unwrap()];
    let steps: Vec<Box<dyn Fn(&mut Editor)>> = vec![
        Box::new(|e| {
            e.insert_text("Hello world").unwrap();
        }),
        Box::new(|e| {
            e.toggle_section(BlockTag::Section(SectionTag::H2)).unwrap();
        }),
        Box::new(|e| {
            e.insert_newline().unwrap();
        }),
        Box::new(|e| {
            e.insert_text("second").unwrap();
        }),
        Box::new(|e| {
            e.toggle_section(BlockTag::List(ListTag::Ol)).unwrap();
        }),
    ];
    for step in &steps {
        now.set(now.get() + 10_000);
        step(&mut editor);
        states.push(editor.serialize().unwrap());
    }
    let final_offset = editor.range().head.offset();
    let final_index = editor.range().head.leaf_section_index(editor.post());

    for expected in states.iter().rev().skip(1) {
        now.set(now.get() + 10_000);
        assert!(editor.undo().unwrap());
        assert_eq!(&editor.serialize().unwrap(), expected);
    }
    assert!(!editor.history().can_undo());

    for expected in states.iter().skip(1) {
        now.set(now.get() + 10_000);
        assert!(editor.redo().unwrap());
        assert_eq!(&editor.serialize().unwrap(), expected);
    }
    assert!(!editor.history().can_redo());
    assert_eq!(editor.range().head.offset(), final_offset);
    assert_eq!(editor.range().head.leaf_section_index(editor.post()), final_index);
}

#[test]
fn test_history_grouping() {
    let (now, clock) = stepping_clock();
    let mut editor = Editor::new(EditorConfig::default()).unwrap().with_clock(clock).unwrap();

    for (at, text) in [(0, "a"), (1_000, "b"), (2_000, "c")] {
        now.set(at);
        editor.insert_text(text).unwrap();
    }
    now.set(2_500);
    editor.delete_selection(Direction::Backward, DeleteUnit::Char).unwrap();
    now.set(20_000);
    editor.insert_text("z").unwrap();

    assert_eq!(texts(editor.post()), vec!["abz"]);
    assert!(editor.undo().unwrap());
    assert_eq!(texts(editor.post()), vec!["ab"]);
    assert!(editor.undo().unwrap());
    assert_eq!(texts(editor.post()), vec!["abc"]);
    assert!(editor.undo().unwrap());
    assert_eq!(texts(editor.post()), vec![""]);
    assert!(!editor.history().can_undo());
}

#[test]
fn test_sessions_leave_markers_coalesced() {
    let mut editor = Editor::new(EditorConfig::default()).unwrap();
    editor.insert_text("one two three").unwrap();

    let section = editor.post().sections()[0];
    for (head, tail) in [(0, 3), (4, 7), (0, 7), (2, 9)] {
        let range = Range::create(editor.post(), section, head, section, tail, None).unwrap();
        editor.set_range(range);
        editor.toggle_markup(MarkupTag::B, vec![]).unwrap();
        assert_coalesced(editor.post());
    }

    let range = Range::create(editor.post(), section, 1, section, 5, None).unwrap();
    editor.set_range(range);
    editor.delete_selection(Direction::Forward, DeleteUnit::Char).unwrap();
    assert_coalesced(editor.post());

    // Coalescing again changes nothing
    let before = editor.serialize().unwrap();
    editor.run(|_| Ok(())).unwrap();
    assert_eq!(editor.serialize().unwrap(), before);
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Rc<RefCell<Vec<String>>>,
}

impl Renderer for Recorder {
    fn will_render(&mut self) {
        self.calls.borrow_mut().push("will".to_string());
    }

    fn render(&mut self, _post: &Post, work: &RenderWork) -> folio_editor::EditorResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("render {} {}", work.dirty.is_empty(), work.removed.len()));
        Ok(())
    }

    fn did_render(&mut self) {
        self.calls.borrow_mut().push("did".to_string());
    }
}

#[test]
fn test_renderer_bracket() {
    let mut editor = Editor::new(EditorConfig::default()).unwrap();
    let recorder = Recorder::default();
    let calls = recorder.calls.clone();
    editor.set_renderer(recorder);

    editor.insert_text("text").unwrap();
    {
        let calls = calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], "will");
        assert!(calls[1].starts_with("render false"));
        assert_eq!(calls[2], "did");
    }

    calls.borrow_mut().clear();
    editor.run(|_| Ok(())).unwrap();
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_html_renderer_follows_edits() {
    let mut editor = Editor::new(EditorConfig::default()).unwrap();
    editor.set_renderer(HtmlRenderer::new());
    editor.render_all().unwrap();
    editor.insert_text("title").unwrap();
    editor.toggle_section(BlockTag::Section(SectionTag::H1)).unwrap();

    let html = folio_editor::render::render_html(editor.post()).unwrap();
    assert_eq!(html, "<h1>title</h1>");
}

#[test]
fn test_replay_script_from_json() {
    let mut editor = Editor::new(EditorConfig::default()).unwrap();
    let script = r#"[
        { "type": "insertText", "at": { "section": 0, "offset": 0 }, "text": "first second" },
        { "type": "toggleMarkup", "head": { "section": 0, "offset": 0 },
          "tail": { "section": 0, "offset": 5 }, "tag": "em" },
        { "type": "splitSection", "at": { "section": 0, "offset": 5 } },
        { "type": "toggleSection", "head": { "section": 1, "offset": 0 },
          "tail": { "section": 1, "offset": 0 }, "tag": "ul" },
        { "type": "insertAtom", "at": { "section": 1, "offset": 7 },
          "name": "mention", "value": "@folio" }
    ]"#;

    let edits = edits::parse_script(script).unwrap();
    edits::replay(&mut editor, &edits).unwrap();

    let post = editor.post();
    let sections = post.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(post.text(sections[0]), "first");
    assert!(post.node(sections[1]).unwrap().is_list_section());
    assert_eq!(item_texts(post, sections[1]), vec![" second@folio"]);

    let doc = editor.serialize().unwrap();
    assert_eq!(doc.atoms.len(), 1);
    let reparsed = parser::parse(&doc).unwrap();
    assert_eq!(serializer::serialize(&reparsed, FormatVersion::V0_3_2).unwrap(), doc);

    let bad = Edit::SplitSection { at: Point::new(9, 0) };
    assert!(editor.apply(&bad).is_err());
}
