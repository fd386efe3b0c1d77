use super::{parse_point, read_document, write_document};
use anyhow::{anyhow, Result};
use clap::Args;
use folio_editor::Point;
use folio_model::{parser, serializer, FormatVersion, Position, Range, SerializedPost};
use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TrimArgs {
    /// Serialized document (JSON)
    pub doc: PathBuf,

    /// Start of the range, as leaf-section:offset
    #[arg(long, value_parser = parse_point)]
    pub head: Point,

    /// End of the range, as leaf-section:offset
    #[arg(long, value_parser = parse_point)]
    pub tail: Point,

    /// Format version to write (defaults to the input's)
    #[arg(long)]
    pub format: Option<FormatVersion>,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn trim(args: TrimArgs) -> Result<()> {
    let doc = read_document(&args.doc)?;
    let version = args.format.unwrap_or(doc.version);
    let trimmed = trim_document(&doc, args.head, args.tail, version)?;
    write_document(&trimmed, args.out.as_deref(), args.compact)
}

pub fn trim_document(doc: &SerializedPost, head: Point, tail: Point, version: FormatVersion) -> Result<SerializedPost> {
    let post = parser::parse(doc)?;
    let resolve = |point: Point| {
        Position::from_leaf_index(&post, point.section, point.offset).map_err(|e| anyhow!("Point {point}: {e}"))
    };
    let (from, to) = (resolve(head)?, resolve(tail)?);
    if from.compare(&post, &to) == Ordering::Greater {
        return Err(anyhow!("Range head {head} is after its tail {tail}"));
    }

    let trimmed = post.trim_to(&Range::new(from, to, None))?;
    Ok(serializer::serialize(&trimmed, version)?)
}
