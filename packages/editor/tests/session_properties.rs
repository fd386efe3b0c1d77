//! Property tests for markup sessions and history

use folio_editor::{DeleteUnit, Editor, EditorConfig, PostEditor};
use folio_model::{parser, Direction, LinkedStore, MarkupTag, Markuperable, Position, Post, Range};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

const TEXT: &str = "Hello wonderful world";

const DOC: &str = r#"{
    "version": "0.3.2",
    "markups": [["b"]],
    "sections": [
        [1, "h2", [[0, [], 0, "Title here"]]],
        [1, "p", [[0, [], 0, "Some "], [0, [0], 1, "bold"], [0, [], 0, " words"]]],
        [3, "ul", [[[0, [], 0, "one"]], [[0, [], 0, ""]], [[0, [], 0, "three"]]]],
        [1, "p", []],
        [1, "blockquote", [[0, [], 0, "last line"]]]
    ]
}"#;

const CLIPS: [&str; 3] = [
    r#"{"version": "0.3.2", "sections": [[1, "p", [[0, [], 0, "pasted"]]]]}"#,
    r#"{"version": "0.3.2", "sections": [[1, "p", [[0, [], 0, "lead"]]], [3, "ol", [[[0, [], 0, "x"]]]]]}"#,
    r#"{"version": "0.3.2", "sections": [[3, "ul", [[[0, [], 0, "a"]], [[0, [], 0, "b"]]]], [1, "h1", []]]}"#,
];

/// Session operations addressed by leaf-section index and offset; both wrap
/// around the current document.
#[derive(Debug, Clone)]
enum Op {
    Delete((usize, usize), Direction, DeleteUnit),
    DeleteRange((usize, usize), (usize, usize)),
    Split((usize, usize)),
    InsertMarkers((usize, usize), String),
    Paste((usize, usize), usize),
}

fn point() -> impl Strategy<Value = (usize, usize)> {
    (0..16usize, 0..32usize)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let direction = prop_oneof![Just(Direction::Backward), Just(Direction::Forward)];
    let unit = prop_oneof![Just(DeleteUnit::Char), Just(DeleteUnit::Word)];
    prop_oneof![
        (point(), direction, unit).prop_map(|(at, direction, unit)| Op::Delete(at, direction, unit)),
        (point(), point()).prop_map(|(a, b)| Op::DeleteRange(a, b)),
        point().prop_map(Op::Split),
        (point(), "[a-z ]{0,6}").prop_map(|(at, text)| Op::InsertMarkers(at, text)),
        (point(), 0..CLIPS.len()).prop_map(|(at, clip)| Op::Paste(at, clip)),
    ]
}

fn resolve(post: &Post, (index, offset): (usize, usize)) -> Option<Position> {
    let sections = post.leaf_sections();
    let section = *sections.get(index % sections.len().max(1))?;
    let offset = offset % (post.length(section) + 1);
    Position::new(post, section, offset).ok()
}

fn check_in_bounds(post: &Post, position: Position, op: &Op) -> Result<(), TestCaseError> {
    let Some(section) = position.section() else {
        return Err(TestCaseError::fail(format!("{op:?} returned a blank position")));
    };
    prop_assert!(post.is_attached(section), "{:?} returned a detached section", op);
    prop_assert!(
        Position::new(post, section, position.offset()).is_ok(),
        "{:?} returned offset {} past length {}",
        op,
        position.offset(),
        post.length(section)
    );
    Ok(())
}

fn apply(editor: &mut PostEditor<'_>, op: &Op) -> Option<Position> {
    let post = editor.post();
    let result = match op {
        Op::Delete(at, direction, unit) => {
            let at = resolve(post, *at)?;
            editor.delete_at_position(at, *direction, *unit)
        }
        Op::DeleteRange(a, b) => {
            let (a, b) = (resolve(post, *a)?, resolve(post, *b)?);
            let key = |p: Position| (p.leaf_section_index(post), p.offset());
            let range = if key(a) <= key(b) { Range::new(a, b, None) } else { Range::new(b, a, None) };
            editor.delete_range(range)
        }
        Op::Split(at) => {
            let at = resolve(post, *at)?;
            editor.split_section(at)
        }
        Op::InsertMarkers(at, text) => {
            let at = resolve(post, *at)?;
            let marker = editor.builder().create_marker(text, vec![]);
            editor.insert_markers(at, vec![marker])
        }
        Op::Paste(at, clip) => {
            let at = resolve(post, *at)?;
            let source = parser::parse_str(CLIPS[*clip]).ok()?;
            editor.insert_post(at, &source)
        }
    };
    Some(result.unwrap())
}

fn toggle_strategy() -> impl Strategy<Value = (usize, usize, MarkupTag)> {
    let len = TEXT.len();
    (0..=len, 0..=len, prop_oneof![Just(MarkupTag::B), Just(MarkupTag::I), Just(MarkupTag::U)])
        .prop_map(|(a, b, tag)| (a.min(b), a.max(b), tag))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn toggles_keep_markers_coalesced_and_undo_restores(
        toggles in proptest::collection::vec(toggle_strategy(), 1..8)
    ) {
        let config = EditorConfig { undo_depth: 0, undo_block_timeout_ms: 0, ..EditorConfig::default() };
        let mut typed = Editor::new(config.clone()).unwrap();
        typed.insert_text(TEXT).unwrap();
        let original = typed.serialize().unwrap();
        let mut editor = Editor::from_serialized(&original, config).unwrap();

        for (head, tail, tag) in toggles {
            let section = editor.post().sections()[0];
            let range = Range::create(editor.post(), section, head, section, tail, None).unwrap();
            editor.set_range(range);
            editor.toggle_markup(tag, vec![]).unwrap();

            let post = editor.post();
            prop_assert_eq!(post.text(section), TEXT);
            let leaves = post.children(section);
            for pair in leaves.windows(2) {
                let left = post.leaf(pair[0]).unwrap();
                let right = post.leaf(pair[1]).unwrap();
                prop_assert_ne!(left.markups(), right.markups());
            }
        }

        while editor.undo().unwrap() {}
        prop_assert_eq!(editor.serialize().unwrap(), original);
    }

    #[test]
    fn session_positions_stay_in_bounds(ops in proptest::collection::vec(op_strategy(), 1..12)) {
        let mut post = parser::parse_str(DOC).unwrap();

        for op in &ops {
            let mut editor = PostEditor::new(&mut post, Range::blank());
            let Some(position) = apply(&mut editor, op) else {
                continue;
            };
            check_in_bounds(editor.post(), position, op)?;

            let completion = editor.complete().unwrap();
            check_in_bounds(&post, completion.range.head, op)?;
            check_in_bounds(&post, completion.range.tail, op)?;
        }
    }
}
