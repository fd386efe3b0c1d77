//! [`SerializedPost`] → Post.

use crate::builder::Builder;
use crate::error::{ModelError, ModelResult};
use crate::format::{pairs, FormatVersion, MarkerEntry, SectionEntry, SerializedPost, ATOM_MARKER_TYPE, MARKUP_MARKER_TYPE};
use crate::linked_list::LinkedStore;
use crate::markup::MarkupId;
use crate::node::NodeId;
use crate::post::Post;
use crate::section::{Attributes, CardMode};
use serde_json::Value;
use tracing::debug;

/// Build a fresh post from a serialized document.
pub fn parse(doc: &SerializedPost) -> ModelResult<Post> {
    let mut post = Post::new();
    let sections = parse_sections(&mut post.builder(), doc)?;
    let root = post.root();
    for section in sections {
        post.append(root, section)?;
    }
    Ok(post)
}

/// Parse JSON text, reporting an unknown version before anything else.
pub fn parse_str(json: &str) -> ModelResult<Post> {
    let value: Value = serde_json::from_str(json)?;
    match value.get("version").and_then(Value::as_str) {
        Some(version) => {
            version.parse::<FormatVersion>()?;
        }
        None => return Err(ModelError::malformed("missing version")),
    }
    parse(&serde_json::from_value(value)?)
}

/// Create the document's sections as detached nodes through `builder`.
pub fn parse_sections(builder: &mut Builder<'_>, doc: &SerializedPost) -> ModelResult<Vec<NodeId>> {
    let mut markups = Vec::with_capacity(doc.markups.len());
    for entry in &doc.markups {
        markups.push(builder.create_markup_named(entry.tag(), entry.attributes()?)?);
    }

    let parser = Parser { doc, markups };
    let mut sections = Vec::with_capacity(doc.sections.len());
    for entry in &doc.sections {
        sections.push(parser.section(builder, entry)?);
    }

    debug!(version = %doc.version, sections = sections.len(), "parsed sections");
    Ok(sections)
}

struct Parser<'d> {
    doc: &'d SerializedPost,
    markups: Vec<MarkupId>,
}

impl Parser<'_> {
    fn section(&self, builder: &mut Builder<'_>, entry: &SectionEntry) -> ModelResult<NodeId> {
        match entry {
            SectionEntry::Markup {
                tag,
                markers,
                attributes,
            } => {
                let leaves = self.markers(builder, markers)?;
                builder.create_markup_section(tag.parse()?, leaves, self.attributes(attributes)?)
            }
            SectionEntry::List {
                tag,
                items,
                attributes,
            } => {
                let mut item_ids = Vec::with_capacity(items.len());
                for markers in items {
                    let leaves = self.markers(builder, markers)?;
                    item_ids.push(builder.create_list_item(leaves)?);
                }
                builder.create_list_section(tag.parse()?, item_ids, self.attributes(attributes)?)
            }
            SectionEntry::Image { src } => Ok(builder.create_image(src.clone())),
            SectionEntry::Card { index } => {
                let (name, payload) = self
                    .doc
                    .cards
                    .get(*index)
                    .ok_or_else(|| ModelError::malformed(format!("no card at index {}", index)))?;
                Ok(builder.create_card(name.clone(), payload.clone(), CardMode::Display))
            }
        }
    }

    fn attributes(&self, attributes: &Option<Vec<String>>) -> ModelResult<Attributes> {
        match attributes {
            Some(flat) if self.doc.version.supports_section_attributes() => {
                Ok(pairs(flat)?.into_iter().collect())
            }
            _ => Ok(Attributes::new()),
        }
    }

    fn markers(&self, builder: &mut Builder<'_>, entries: &[MarkerEntry]) -> ModelResult<Vec<NodeId>> {
        let mut open: Vec<MarkupId> = Vec::new();
        let mut leaves = Vec::with_capacity(entries.len());

        for MarkerEntry(marker_type, opened, closed, value) in entries {
            for index in opened {
                let markup = self
                    .markups
                    .get(*index)
                    .ok_or_else(|| ModelError::malformed(format!("no markup at index {}", index)))?;
                open.push(*markup);
            }
            let markups = open.clone();

            let leaf = match *marker_type {
                MARKUP_MARKER_TYPE => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| ModelError::malformed("marker value must be text"))?;
                    builder.create_marker(text, markups)
                }
                ATOM_MARKER_TYPE => {
                    let index = value
                        .as_u64()
                        .ok_or_else(|| ModelError::malformed("atom marker value must be an index"))?;
                    let (name, atom_value, payload) = self
                        .doc
                        .atoms
                        .get(index as usize)
                        .ok_or_else(|| ModelError::malformed(format!("no atom at index {}", index)))?;
                    builder.create_atom(name.clone(), atom_value.clone(), payload.clone(), markups)
                }
                other => return Err(ModelError::malformed(format!("unknown marker type {}", other))),
            };
            leaves.push(leaf);

            if *closed > open.len() {
                return Err(ModelError::malformed("marker closes more markups than are open"));
            }
            open.truncate(open.len() - closed);
        }

        Ok(leaves)
    }
}
