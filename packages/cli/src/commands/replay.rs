use super::{read_document, write_document};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::render::render_html;
use folio_editor::{edits, Editor, EditorConfig};
use folio_model::SerializedPost;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Serialized document (JSON)
    pub doc: PathBuf,

    /// JSON array of edits
    pub edits: PathBuf,

    /// Print the result as HTML instead of JSON
    #[arg(long)]
    pub html: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let doc = read_document(&args.doc)?;
    let script = fs::read_to_string(&args.edits).with_context(|| format!("Cannot read {}", args.edits.display()))?;

    let editor = replay_script(&doc, &script, config)?;
    eprintln!(
        "{} Applied edits, {} undo levels",
        "✓".green(),
        editor.history().undo_levels()
    );

    if args.html {
        println!("{}", render_html(editor.post())?);
        return Ok(());
    }
    write_document(&editor.serialize()?, args.out.as_deref(), args.compact)
}

pub fn replay_script(doc: &SerializedPost, script: &str, config: EditorConfig) -> Result<Editor> {
    let edits = edits::parse_script(script).context("Invalid edit script")?;
    let mut editor = Editor::from_serialized(doc, config)?;
    edits::replay(&mut editor, &edits)?;
    info!(edits = edits.len(), version = editor.version(), "Replayed script");
    Ok(editor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "version": "0.3.2",
        "sections": [[1, "p", [[0, [], 0, "Hello world"]]]]
    }"#;

    #[test]
    fn test_replay_script() {
        let doc = SerializedPost::from_json(DOC).unwrap();
        let script = r#"[
            { "type": "toggleMarkup", "head": { "section": 0, "offset": 6 },
              "tail": { "section": 0, "offset": 11 }, "tag": "b" },
            { "type": "setAttribute", "head": { "section": 0, "offset": 0 },
              "tail": { "section": 0, "offset": 0 }, "key": "text-align", "value": "center" }
        ]"#;

        let editor = replay_script(&doc, script, EditorConfig::default()).unwrap();
        assert_eq!(
            render_html(editor.post()).unwrap(),
            "<p data-md-text-align=\"center\">Hello <b>world</b></p>"
        );
        assert_eq!(editor.version(), 2);
    }

    #[test]
    fn test_replay_reports_bad_scripts() {
        let doc = SerializedPost::from_json(DOC).unwrap();
        assert!(replay_script(&doc, "{", EditorConfig::default()).is_err());

        let out_of_range = r#"[{ "type": "splitSection", "at": { "section": 4, "offset": 0 } }]"#;
        let err = replay_script(&doc, out_of_range, EditorConfig::default()).unwrap_err();
        assert!(err.to_string().contains("4:0"));
    }
}
