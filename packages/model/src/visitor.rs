use crate::leaf::{Atom, Marker};
use crate::linked_list::LinkedStore;
use crate::node::{NodeId, NodeKind};
use crate::post::Post;
use crate::section::{Card, Image, ListSection, MarkupSection};

/// Visitor over a post's section tree.
///
/// Default implementations walk the whole tree in document order. Override
/// specific visit_* methods to act on nodes; call the matching walk_*
/// function to keep descending.
pub trait Visitor: Sized {
    fn visit_post(&mut self, post: &Post) {
        walk_post(self, post);
    }

    fn visit_markup_section(&mut self, post: &Post, id: NodeId, _section: &MarkupSection) {
        walk_children(self, post, id);
    }

    fn visit_list_section(&mut self, post: &Post, id: NodeId, _list: &ListSection) {
        walk_children(self, post, id);
    }

    fn visit_list_item(&mut self, post: &Post, id: NodeId) {
        walk_children(self, post, id);
    }

    fn visit_card(&mut self, _post: &Post, _id: NodeId, _card: &Card) {
        // Leaf section, no children to walk
    }

    fn visit_image(&mut self, _post: &Post, _id: NodeId, _image: &Image) {
        // Leaf section, no children to walk
    }

    fn visit_marker(&mut self, _post: &Post, _id: NodeId, _marker: &Marker) {}

    fn visit_atom(&mut self, _post: &Post, _id: NodeId, _atom: &Atom) {}
}

pub fn walk_post<V: Visitor>(visitor: &mut V, post: &Post) {
    walk_children(visitor, post, post.root());
}

pub fn walk_children<V: Visitor>(visitor: &mut V, post: &Post, parent: NodeId) {
    for child in post.items(parent) {
        walk_node(visitor, post, child);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, post: &Post, id: NodeId) {
    match post.n(id).kind() {
        NodeKind::Post => walk_post(visitor, post),
        NodeKind::MarkupSection(section) => visitor.visit_markup_section(post, id, section),
        NodeKind::ListSection(list) => visitor.visit_list_section(post, id, list),
        NodeKind::ListItem(_) => visitor.visit_list_item(post, id),
        NodeKind::Card(card) => visitor.visit_card(post, id, card),
        NodeKind::Image(image) => visitor.visit_image(post, id, image),
        NodeKind::Leaf(crate::leaf::Leaf::Marker(marker)) => visitor.visit_marker(post, id, marker),
        NodeKind::Leaf(crate::leaf::Leaf::Atom(atom)) => visitor.visit_atom(post, id, atom),
    }
}
