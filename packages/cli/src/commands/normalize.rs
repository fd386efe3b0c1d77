use super::{read_document, write_document};
use anyhow::Result;
use clap::Args;
use folio_model::{parser, serializer, FormatVersion, Post, SerializedPost};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Serialized document (JSON)
    pub doc: PathBuf,

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

pub fn normalize(args: NormalizeArgs) -> Result<()> {
    let doc = read_document(&args.doc)?;
    let version = args.format.unwrap_or(doc.version);
    write_document(&normalize_document(&doc, version)?, args.out.as_deref(), args.compact)
}

/// Parse, merge neighbouring markers with identical markups, and serialize
/// again in `version`.
pub fn normalize_document(doc: &SerializedPost, version: FormatVersion) -> Result<SerializedPost> {
    let mut post = parser::parse(doc)?;
    let merged = coalesce_all(&mut post)?;
    debug!(sections = merged, "Coalesced sections");
    Ok(serializer::serialize(&post, version)?)
}

fn coalesce_all(post: &mut Post) -> Result<usize> {
    let mut merged = 0;
    for section in post.leaf_sections() {
        if post.node(section)?.is_markerable() && post.coalesce_markers(section)? {
            merged += 1;
        }
    }
    Ok(merged)
}
