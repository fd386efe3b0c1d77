//! # Rendering
//!
//! Rendering is driven by the post's dirty bookkeeping. After every
//! completed session the editor drains [`RenderWork`] from the post and
//! hands it to the attached [`Renderer`] inside a `will_render` /
//! `did_render` bracket.
//!
//! [`HtmlRenderer`] keeps one HTML fragment per top-level section and only
//! redraws the sections a session touched.

use crate::errors::EditorResult;
use folio_model::visitor::{walk_children, Visitor};
use folio_model::{Atom, Card, CardMode, Image, ListSection, Marker, MarkupId, MarkupSection, ModelError, NodeId, Post, RenderWork};
use std::collections::HashMap;
use tracing::trace;

pub trait Renderer {
    fn will_render(&mut self) {}

    fn render(&mut self, post: &Post, work: &RenderWork) -> EditorResult<()>;

    fn did_render(&mut self) {}
}

/// Render the whole post to HTML.
pub fn render_html(post: &Post) -> EditorResult<String> {
    let mut writer = HtmlWriter::default();
    writer.visit_post(post);
    writer.finish()
}

/// Render one top-level section (and its children) to HTML.
pub fn render_section_html(post: &Post, section: NodeId) -> EditorResult<String> {
    let mut writer = HtmlWriter::default();
    folio_model::visitor::walk_node(&mut writer, post, section);
    writer.finish()
}

/// Incremental HTML renderer caching one fragment per top-level section.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    fragments: HashMap<NodeId, String>,
    /// Sections drawn so far, across all passes
    pub sections_rendered: usize,
    /// Completed `will_render`/`did_render` brackets
    pub passes: usize,
    in_pass: bool,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document as last rendered, in section order.
    pub fn html(&self, post: &Post) -> String {
        post.sections()
            .into_iter()
            .filter_map(|section| self.fragments.get(&section))
            .map(String::as_str)
            .collect()
    }

    pub fn fragment(&self, section: NodeId) -> Option<&str> {
        self.fragments.get(&section).map(String::as_str)
    }
}

impl Renderer for HtmlRenderer {
    fn will_render(&mut self) {
        self.in_pass = true;
    }

    fn render(&mut self, post: &Post, work: &RenderWork) -> EditorResult<()> {
        for removed in &work.removed {
            self.fragments.remove(removed);
        }

        let mut sections: Vec<NodeId> = Vec::new();
        for node in &work.dirty {
            if !post.is_attached(*node) {
                continue;
            }
            let section = post.top_level_section(*node);
            if !sections.contains(&section) {
                sections.push(section);
            }
        }

        for section in &sections {
            let html = render_section_html(post, *section)?;
            self.fragments.insert(*section, html);
        }
        self.sections_rendered += sections.len();
        trace!(sections = sections.len(), removed = work.removed.len(), "Rendered");
        Ok(())
    }

    fn did_render(&mut self) {
        if self.in_pass {
            self.passes += 1;
            self.in_pass = false;
        }
    }
}

#[derive(Default)]
struct HtmlWriter {
    buffer: String,
    error: Option<ModelError>,
}

impl HtmlWriter {
    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn open_block(&mut self, tag: &str, attributes: &folio_model::Attributes) {
        self.add("<");
        self.add(tag);
        for (name, value) in attributes {
            self.add(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        self.add(">");
    }

    fn open_markup(&mut self, post: &Post, markup: MarkupId) -> Result<(), ModelError> {
        let markup = post.markup(markup)?;
        self.add("<");
        self.add(markup.tag_name());
        for (name, value) in markup.attributes() {
            self.add(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        self.add(">");
        Ok(())
    }

    fn close_markup(&mut self, post: &Post, markup: MarkupId) -> Result<(), ModelError> {
        let tag = post.markup(markup)?.tag_name();
        self.add(&format!("</{tag}>"));
        Ok(())
    }

    /// Wrap a leaf's content in the markups it opens and closes.
    fn leaf(&mut self, post: &Post, id: NodeId, content: &str) {
        if let Err(e) = self.try_leaf(post, id, content) {
            self.error.get_or_insert(e);
        }
    }

    fn try_leaf(&mut self, post: &Post, id: NodeId, content: &str) -> Result<(), ModelError> {
        for markup in post.opened_markups(id)? {
            self.open_markup(post, markup)?;
        }
        self.add(content);
        for markup in post.closed_markups(id)? {
            self.close_markup(post, markup)?;
        }
        Ok(())
    }

    fn finish(self) -> EditorResult<String> {
        match self.error {
            Some(e) => Err(e.into()),
            None => Ok(self.buffer),
        }
    }
}

impl Visitor for HtmlWriter {
    fn visit_markup_section(&mut self, post: &Post, id: NodeId, section: &MarkupSection) {
        let tag = section.tag.as_str();
        self.open_block(tag, &section.attributes);
        if post.is_blank(id) {
            self.add("<br>");
        } else {
            walk_children(self, post, id);
        }
        self.add(&format!("</{tag}>"));
    }

    fn visit_list_section(&mut self, post: &Post, id: NodeId, list: &ListSection) {
        let tag = list.tag.as_str();
        self.open_block(tag, &list.attributes);
        walk_children(self, post, id);
        self.add(&format!("</{tag}>"));
    }

    fn visit_list_item(&mut self, post: &Post, id: NodeId) {
        self.add("<li>");
        if post.is_blank(id) {
            self.add("<br>");
        } else {
            walk_children(self, post, id);
        }
        self.add("</li>");
    }

    fn visit_card(&mut self, _post: &Post, _id: NodeId, card: &Card) {
        self.add(&format!(
            "<div class=\"__folio-card\" data-card=\"{}\" data-mode=\"{}\"></div>",
            escape_html(card.name()),
            match card.mode() {
                CardMode::Display => "display",
                CardMode::Edit => "edit",
            }
        ));
    }

    fn visit_image(&mut self, _post: &Post, _id: NodeId, image: &Image) {
        self.add(&format!("<img src=\"{}\">", escape_html(&image.src)));
    }

    fn visit_marker(&mut self, post: &Post, id: NodeId, marker: &Marker) {
        let text = escape_html(&folio_model::Markuperable::text(marker));
        self.leaf(post, id, &text);
    }

    fn visit_atom(&mut self, post: &Post, id: NodeId, atom: &Atom) {
        let html = format!(
            "<span class=\"__folio-atom\" data-atom=\"{}\">{}</span>",
            escape_html(atom.name()),
            escape_html(atom.value())
        );
        self.leaf(post, id, &html);
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{LinkedStore, ListTag, MarkupTag, SectionTag};

    fn sample() -> (Post, NodeId, NodeId) {
        let mut post = Post::new();
        let root = post.root();
        let mut builder = post.builder();
        let bold = builder.create_markup(MarkupTag::B, vec![]);
        let link = builder.create_markup(MarkupTag::A, vec![("href".to_string(), "https://x.io".to_string())]);
        let plain = builder.create_marker("a < b ", vec![]);
        let strong = builder.create_marker("bold", vec![bold]);
        let linked = builder.create_marker("link", vec![bold, link]);
        let paragraph = builder
            .create_markup_section(SectionTag::P, vec![plain, strong, linked], Default::default())
            .unwrap();
        let item = builder.create_list_item(vec![]).unwrap();
        let list = builder.create_list_section(ListTag::Ol, vec![item], Default::default()).unwrap();
        post.append(root, paragraph).unwrap();
        post.append(root, list).unwrap();
        (post, paragraph, list)
    }

    #[test]
    fn test_render_html() {
        let (post, _, _) = sample();
        let html = render_html(&post).unwrap();
        assert_eq!(
            html,
            "<p>a &lt; b <b>bold<a href=\"https://x.io\">link</a></b></p><ol><li><br></li></ol>"
        );
    }

    #[test]
    fn test_incremental_render_only_redraws_dirty_sections() {
        let (mut post, paragraph, list) = sample();
        let mut renderer = HtmlRenderer::new();

        let work = post.take_render_work();
        renderer.will_render();
        renderer.render(&post, &work).unwrap();
        renderer.did_render();
        assert_eq!(renderer.sections_rendered, 2);
        assert_eq!(renderer.passes, 1);

        post.set_section_tag(paragraph, SectionTag::H1).unwrap();
        let work = post.take_render_work();
        renderer.render(&post, &work).unwrap();
        assert_eq!(renderer.sections_rendered, 3);
        assert!(renderer.fragment(paragraph).unwrap().starts_with("<h1>"));

        let root = post.root();
        post.remove(root, list).unwrap();
        let work = post.take_render_work();
        assert_eq!(work.removed, vec![list]);
        renderer.render(&post, &work).unwrap();
        assert!(renderer.fragment(list).is_none());
        assert!(renderer.html(&post).ends_with("</h1>"));
    }
}
