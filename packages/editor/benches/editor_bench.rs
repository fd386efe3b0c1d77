use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_editor::{DeleteUnit, Editor, EditorConfig};
use folio_model::{parser, serializer, BlockTag, Direction, FormatVersion, ListTag, MarkupTag, Range, SectionTag};

fn typing(c: &mut Criterion) {
    c.bench_function("type_200_chars", |b| {
        b.iter(|| {
            let mut editor = Editor::new(EditorConfig::default()).unwrap();
            for _ in 0..200 {
                editor.insert_text(black_box("x")).unwrap();
            }
            editor
        })
    });
}

fn build_document(paragraphs: usize) -> Editor {
    let mut editor = Editor::new(EditorConfig::default()).unwrap();
    for i in 0..paragraphs {
        editor
            .insert_text(&format!("Paragraph {i} with some words to format"))
            .unwrap();
        editor.insert_newline().unwrap();
    }
    editor
}

fn formatting(c: &mut Criterion) {
    let editor = build_document(50);
    let doc = editor.serialize().unwrap();

    c.bench_function("toggle_markup_across_document", |b| {
        b.iter(|| {
            let mut editor = Editor::from_serialized(&doc, EditorConfig::default()).unwrap();
            let range = editor.post().to_range();
            editor.set_range(range);
            editor.toggle_markup(MarkupTag::Strong, vec![]).unwrap();
            editor
        })
    });

    c.bench_function("toggle_list_across_document", |b| {
        b.iter(|| {
            let mut editor = Editor::from_serialized(&doc, EditorConfig::default()).unwrap();
            let range = editor.post().to_range();
            editor.set_range(range);
            editor.toggle_section(BlockTag::List(ListTag::Ul)).unwrap();
            editor.toggle_section(BlockTag::Section(SectionTag::P)).unwrap();
            editor
        })
    });
}

fn deleting(c: &mut Criterion) {
    let doc = build_document(50).serialize().unwrap();

    c.bench_function("delete_across_sections", |b| {
        b.iter(|| {
            let mut editor = Editor::from_serialized(&doc, EditorConfig::default()).unwrap();
            let sections = editor.post().sections();
            let range = Range::create(editor.post(), sections[3], 4, sections[40], 2, None).unwrap();
            editor.set_range(range);
            editor.delete_selection(Direction::Backward, DeleteUnit::Char).unwrap();
            editor
        })
    });
}

fn history(c: &mut Criterion) {
    c.bench_function("undo_redo_20_steps", |b| {
        let config = EditorConfig {
            undo_depth: 0,
            undo_block_timeout_ms: 0,
            ..EditorConfig::default()
        };
        b.iter(|| {
            let mut editor = Editor::new(config.clone()).unwrap();
            for i in 0..20 {
                editor.insert_text(&format!("step {i} ")).unwrap();
            }
            while editor.undo().unwrap() {}
            while editor.redo().unwrap() {}
            editor
        })
    });
}

fn serialization(c: &mut Criterion) {
    let editor = build_document(200);
    let json = serializer::serialize_to_string(editor.post(), FormatVersion::V0_3_2).unwrap();

    c.bench_function("parse_200_sections", |b| b.iter(|| parser::parse_str(black_box(&json)).unwrap()));

    c.bench_function("serialize_200_sections", |b| {
        b.iter(|| serializer::serialize(black_box(editor.post()), FormatVersion::V0_3_2).unwrap())
    });
}

criterion_group!(benches, typing, formatting, deleting, history, serialization);
criterion_main!(benches);
