//! Node and markup factory bound to one post.
//!
//! Every node is born detached in the post's arena; sections created with
//! children adopt them immediately.

use crate::error::{ModelError, ModelResult};
use crate::leaf::{Atom, Leaf, Marker};
use crate::linked_list::LinkedStore;
use crate::markup::{Markup, MarkupId, MarkupTag};
use crate::node::{NodeId, NodeKind};
use crate::post::Post;
use crate::section::{Attributes, Card, CardMode, Image, ListItem, ListSection, ListTag, MarkupSection, SectionTag};
use serde_json::Value;

pub struct Builder<'p> {
    post: &'p mut Post,
}

impl<'p> Builder<'p> {
    pub(crate) fn new(post: &'p mut Post) -> Self {
        Self { post }
    }

    /// Markups without attributes are shared per tag.
    pub fn create_markup(&mut self, tag: MarkupTag, attributes: Vec<(String, String)>) -> MarkupId {
        let markup = Markup::new(tag, attributes);
        if markup.has_attributes() {
            return self.post.push_markup(markup);
        }
        if let Some(id) = self.post.cached_markup(tag) {
            return id;
        }
        let id = self.post.push_markup(markup);
        self.post.cache_markup(tag, id);
        id
    }

    pub fn create_markup_named(&mut self, tag: &str, attributes: Vec<(String, String)>) -> ModelResult<MarkupId> {
        Ok(self.create_markup(tag.parse()?, attributes))
    }

    pub fn create_leaf(&mut self, leaf: Leaf) -> NodeId {
        self.post.push_node(NodeKind::Leaf(leaf))
    }

    pub fn create_marker(&mut self, text: &str, markups: Vec<MarkupId>) -> NodeId {
        self.create_leaf(Leaf::Marker(Marker::new(text, markups)))
    }

    pub fn create_atom(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        payload: Value,
        markups: Vec<MarkupId>,
    ) -> NodeId {
        self.create_leaf(Leaf::Atom(Atom::new(name, value, payload, markups)))
    }

    pub fn create_markup_section(
        &mut self,
        tag: SectionTag,
        leaves: Vec<NodeId>,
        attributes: Attributes,
    ) -> ModelResult<NodeId> {
        let section = self
            .post
            .push_node(NodeKind::MarkupSection(MarkupSection::new(tag, attributes)));
        self.adopt_leaves(section, leaves)?;
        Ok(section)
    }

    pub fn create_list_item(&mut self, leaves: Vec<NodeId>) -> ModelResult<NodeId> {
        let item = self.post.push_node(NodeKind::ListItem(ListItem));
        self.adopt_leaves(item, leaves)?;
        Ok(item)
    }

    pub fn create_list_section(
        &mut self,
        tag: ListTag,
        items: Vec<NodeId>,
        attributes: Attributes,
    ) -> ModelResult<NodeId> {
        let list = self
            .post
            .push_node(NodeKind::ListSection(ListSection::new(tag, attributes)));
        for item in items {
            if !self.post.node(item)?.is_list_item() {
                return Err(ModelError::NotAListItem(item));
            }
            self.post.append(list, item)?;
        }
        Ok(list)
    }

    pub fn create_card(&mut self, name: impl Into<String>, payload: Value, mode: CardMode) -> NodeId {
        self.create_card_from(Card::new(name, payload, mode))
    }

    pub fn create_card_from(&mut self, card: Card) -> NodeId {
        self.post.push_node(NodeKind::Card(card))
    }

    pub fn create_image(&mut self, src: impl Into<String>) -> NodeId {
        self.post.push_node(NodeKind::Image(Image::new(src)))
    }

    /// Deep copy of a section subtree; the copy is detached.
    pub fn clone_section(&mut self, section: NodeId) -> ModelResult<NodeId> {
        let kind = self.post.node(section)?.kind.clone();
        let kind = match kind {
            NodeKind::Card(card) => NodeKind::Card(card.duplicate()),
            NodeKind::Post | NodeKind::Leaf(_) => return Err(ModelError::NotALeafSection(section)),
            other => other,
        };
        let copy = self.post.push_node(kind);
        for child in self.post.items(section) {
            let child_copy = if self.post.n(child).is_leaf() {
                let leaf = self.post.leaf(child)?.clone();
                self.create_leaf(leaf)
            } else {
                self.clone_section(child)?
            };
            self.post.append(copy, child_copy)?;
        }
        Ok(copy)
    }

    fn adopt_leaves(&mut self, section: NodeId, leaves: Vec<NodeId>) -> ModelResult<()> {
        for leaf in leaves {
            if !self.post.node(leaf)?.is_leaf() {
                return Err(ModelError::NotALeaf(leaf));
            }
            self.post.append(section, leaf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Markuperable;

    #[test]
    fn test_plain_markups_are_interned() {
        let mut post = Post::new();
        let mut builder = post.builder();

        let b1 = builder.create_markup(MarkupTag::B, vec![]);
        let b2 = builder.create_markup(MarkupTag::B, vec![]);
        let link1 = builder.create_markup(MarkupTag::A, vec![("href".into(), "x".into())]);
        let link2 = builder.create_markup(MarkupTag::A, vec![("href".into(), "x".into())]);

        assert_eq!(b1, b2);
        assert_ne!(link1, link2);
    }

    #[test]
    fn test_sections_reject_wrong_children() {
        let mut post = Post::new();
        let mut builder = post.builder();

        let marker = builder.create_marker("x", vec![]);
        assert_eq!(
            builder.create_list_section(ListTag::Ul, vec![marker], Default::default()),
            Err(ModelError::NotAListItem(marker))
        );

        let image = builder.create_image("https://example.com/cat.png");
        assert_eq!(
            builder.create_markup_section(SectionTag::P, vec![image], Default::default()),
            Err(ModelError::NotALeaf(image))
        );
    }

    #[test]
    fn test_clone_section_is_deep_and_detached() {
        let mut post = Post::new();
        let mut builder = post.builder();
        let marker = builder.create_marker("item", vec![]);
        let item = builder.create_list_item(vec![marker]).unwrap();
        let list = builder
            .create_list_section(ListTag::Ol, vec![item], Default::default())
            .unwrap();
        let copy = builder.clone_section(list).unwrap();

        assert_ne!(copy, list);
        assert!(!post.node(copy).unwrap().is_attached());
        let copied_item = post.children(copy)[0];
        assert_ne!(copied_item, item);
        let copied_marker = post.children(copied_item)[0];
        assert_eq!(post.leaf(copied_marker).unwrap().text(), "item");
    }
}
