//! Post → [`SerializedPost`].

use crate::error::{ModelError, ModelResult};
use crate::format::{flatten, AtomEntry, CardEntry, FormatVersion, MarkerEntry, MarkupEntry, SectionEntry, SerializedPost};
use crate::leaf::{Leaf, Markuperable};
use crate::linked_list::LinkedStore;
use crate::markup::MarkupId;
use crate::node::{NodeId, NodeKind};
use crate::post::Post;
use crate::section::Attributes;
use std::collections::HashMap;
use tracing::debug;

struct Serializer<'a> {
    post: &'a Post,
    version: FormatVersion,
    atoms: Vec<AtomEntry>,
    cards: Vec<CardEntry>,
    markups: Vec<MarkupEntry>,
    markup_indexes: HashMap<MarkupId, usize>,
}

/// Serialize every attached section of `post`.
pub fn serialize(post: &Post, version: FormatVersion) -> ModelResult<SerializedPost> {
    let mut serializer = Serializer {
        post,
        version,
        atoms: Vec::new(),
        cards: Vec::new(),
        markups: Vec::new(),
        markup_indexes: HashMap::new(),
    };

    let mut sections = Vec::new();
    for section in post.sections() {
        sections.push(serializer.section(section)?);
    }

    debug!(
        version = %version,
        sections = sections.len(),
        markups = serializer.markups.len(),
        "serialized post"
    );

    Ok(SerializedPost {
        version,
        atoms: serializer.atoms,
        cards: serializer.cards,
        markups: serializer.markups,
        sections,
    })
}

pub fn serialize_to_string(post: &Post, version: FormatVersion) -> ModelResult<String> {
    serialize(post, version)?.to_json()
}

impl Serializer<'_> {
    fn section(&mut self, id: NodeId) -> ModelResult<SectionEntry> {
        let post = self.post;
        match post.node(id)?.kind() {
            NodeKind::MarkupSection(section) => Ok(SectionEntry::Markup {
                tag: section.tag.as_str().to_string(),
                markers: self.markers(id)?,
                attributes: self.attributes(&section.attributes),
            }),
            NodeKind::ListSection(list) => {
                let mut items = Vec::new();
                for item in post.items(id) {
                    items.push(self.markers(item)?);
                }
                Ok(SectionEntry::List {
                    tag: list.tag.as_str().to_string(),
                    items,
                    attributes: self.attributes(&list.attributes),
                })
            }
            NodeKind::Card(card) => {
                self.cards.push((card.name().to_string(), card.payload().clone()));
                Ok(SectionEntry::Card {
                    index: self.cards.len() - 1,
                })
            }
            NodeKind::Image(image) => Ok(SectionEntry::Image {
                src: image.src.clone(),
            }),
            NodeKind::ListItem(_) | NodeKind::Post | NodeKind::Leaf(_) => {
                Err(ModelError::NotALeafSection(id))
            }
        }
    }

    fn attributes(&self, attributes: &Attributes) -> Option<Vec<String>> {
        if self.version.supports_section_attributes() && !attributes.is_empty() {
            Some(flatten(attributes))
        } else {
            None
        }
    }

    /// Leaves of one markerable, encoding markup stacks as open/close deltas.
    ///
    /// The stack left open after a leaf is always the longest common prefix
    /// of its markups and the next leaf's, so every stack order survives.
    fn markers(&mut self, section: NodeId) -> ModelResult<Vec<MarkerEntry>> {
        let post = self.post;
        let leaves = post.items(section);
        let mut entries = Vec::with_capacity(leaves.len());
        let mut open = 0;

        for (index, leaf_id) in leaves.iter().enumerate() {
            let leaf = post.leaf(*leaf_id)?;
            let markups = leaf.markups();
            let opened = markups[open.min(markups.len())..]
                .iter()
                .map(|m| self.markup_index(*m))
                .collect::<ModelResult<Vec<_>>>()?;

            let keep = match leaves.get(index + 1) {
                Some(next) => common_prefix(markups, post.leaf(*next)?.markups()),
                None => 0,
            };
            let closed = markups.len() - keep;
            open = keep;

            entries.push(match leaf {
                Leaf::Marker(marker) => MarkerEntry::text(opened, closed, marker.text()),
                Leaf::Atom(atom) => {
                    self.atoms.push((
                        atom.name().to_string(),
                        atom.value().to_string(),
                        atom.payload().clone(),
                    ));
                    MarkerEntry::atom(opened, closed, self.atoms.len() - 1)
                }
            });
        }

        Ok(entries)
    }

    fn markup_index(&mut self, id: MarkupId) -> ModelResult<usize> {
        if let Some(index) = self.markup_indexes.get(&id) {
            return Ok(*index);
        }
        let markup = self.post.markup(id)?;
        let tag = markup.tag_name().to_string();
        let entry = if markup.has_attributes() {
            MarkupEntry::WithAttributes(
                tag,
                flatten(markup.attributes().iter().map(|(name, value)| (name, value))),
            )
        } else {
            MarkupEntry::Plain((tag,))
        };
        self.markups.push(entry);
        let index = self.markups.len() - 1;
        self.markup_indexes.insert(id, index);
        Ok(index)
    }
}

fn common_prefix(a: &[MarkupId], b: &[MarkupId]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
