//! Arena nodes.
//!
//! Every section and leaf of a post is a [`Node`] stored in the post's
//! arena and addressed by a stable [`NodeId`]. The container → children edge
//! is the only ownership edge; `parent`/`prev`/`next` are plain handles.

use crate::leaf::{Atom, Leaf, Marker};
use crate::linked_list::{Link, ListHead};
use crate::section::{Card, Image, ListItem, ListSection, MarkupSection};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Post,
    MarkupSection(MarkupSection),
    ListSection(ListSection),
    ListItem(ListItem),
    Card(Card),
    Image(Image),
    Leaf(Leaf),
}

/// Coarse classification used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Post,
    MarkupSection,
    ListSection,
    ListItem,
    Card,
    Image,
    Marker,
    Atom,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) link: Link<NodeId>,
    pub(crate) children: ListHead<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) dirty: bool,
    pub(crate) rendered: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            link: Link::default(),
            children: ListHead::default(),
            kind,
            dirty: true,
            rendered: false,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Post => NodeType::Post,
            NodeKind::MarkupSection(_) => NodeType::MarkupSection,
            NodeKind::ListSection(_) => NodeType::ListSection,
            NodeKind::ListItem(_) => NodeType::ListItem,
            NodeKind::Card(_) => NodeType::Card,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::Leaf(Leaf::Marker(_)) => NodeType::Marker,
            NodeKind::Leaf(Leaf::Atom(_)) => NodeType::Atom,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.link.parent
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.link.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.link.next
    }

    pub fn child_count(&self) -> usize {
        self.children.length
    }

    pub fn is_attached(&self) -> bool {
        self.link.parent.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_section(&self) -> bool {
        !matches!(self.kind, NodeKind::Post | NodeKind::Leaf(_))
    }

    /// Sections with no section-level children.
    pub fn is_leaf_section(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::MarkupSection(_) | NodeKind::ListItem(_) | NodeKind::Card(_) | NodeKind::Image(_)
        )
    }

    pub fn is_markerable(&self) -> bool {
        matches!(self.kind, NodeKind::MarkupSection(_) | NodeKind::ListItem(_))
    }

    pub fn is_markup_section(&self) -> bool {
        matches!(self.kind, NodeKind::MarkupSection(_))
    }

    pub fn is_list_section(&self) -> bool {
        matches!(self.kind, NodeKind::ListSection(_))
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self.kind, NodeKind::ListItem(_))
    }

    pub fn is_card(&self) -> bool {
        matches!(self.kind, NodeKind::Card(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, NodeKind::Image(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match &mut self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        self.as_leaf().and_then(Leaf::as_marker)
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        self.as_leaf().and_then(Leaf::as_atom)
    }

    pub fn as_markup_section(&self) -> Option<&MarkupSection> {
        match &self.kind {
            NodeKind::MarkupSection(section) => Some(section),
            _ => None,
        }
    }

    pub fn as_list_section(&self) -> Option<&ListSection> {
        match &self.kind {
            NodeKind::ListSection(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_card(&self) -> Option<&Card> {
        match &self.kind {
            NodeKind::Card(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut Card> {
        match &mut self.kind {
            NodeKind::Card(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.kind {
            NodeKind::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Tag of a tag-nameable section.
    pub fn tag_name(&self) -> Option<&'static str> {
        use crate::section::TagNameable;
        match &self.kind {
            NodeKind::MarkupSection(section) => Some(section.tag_name()),
            NodeKind::ListSection(list) => Some(list.tag_name()),
            NodeKind::ListItem(item) => Some(item.tag_name()),
            _ => None,
        }
    }

    /// Attribute map of an attributable section.
    pub fn attributes(&self) -> Option<&crate::section::Attributes> {
        use crate::section::Attributable;
        match &self.kind {
            NodeKind::MarkupSection(section) => Some(section.attributes()),
            NodeKind::ListSection(list) => Some(list.attributes()),
            _ => None,
        }
    }

    pub(crate) fn attributable_mut(&mut self) -> Option<&mut dyn crate::section::Attributable> {
        match &mut self.kind {
            NodeKind::MarkupSection(section) => Some(section),
            NodeKind::ListSection(list) => Some(list),
            _ => None,
        }
    }
}
