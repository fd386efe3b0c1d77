pub mod inspect;
pub mod normalize;
pub mod replay;
pub mod trim;

pub use inspect::{inspect, InspectArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use replay::{replay, ReplayArgs};
pub use trim::{trim, TrimArgs};

use anyhow::{Context, Result};
use folio_editor::Point;
use folio_model::SerializedPost;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgError {
    #[error("expected <section>:<offset>, got `{0}`")]
    InvalidPoint(String),
}

/// Parse a `section:offset` command-line point.
pub fn parse_point(arg: &str) -> Result<Point, ArgError> {
    let invalid = || ArgError::InvalidPoint(arg.to_string());
    let (section, offset) = arg.split_once(':').ok_or_else(invalid)?;
    let section = section.trim().parse().map_err(|_| invalid())?;
    let offset = offset.trim().parse().map_err(|_| invalid())?;
    Ok(Point::new(section, offset))
}

pub fn read_document(path: &Path) -> Result<SerializedPost> {
    let json = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    SerializedPost::from_json(&json).with_context(|| format!("Invalid document {}", path.display()))
}

/// Print `doc` as JSON, or write it to `out` when given.
pub fn write_document(doc: &SerializedPost, out: Option<&Path>, compact: bool) -> Result<()> {
    let json = if compact { doc.to_json()? } else { doc.to_json_pretty()? };
    match out {
        Some(path) => fs::write(path, json + "\n").with_context(|| format!("Cannot write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
