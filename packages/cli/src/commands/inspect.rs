use super::read_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_model::visitor::{walk_children, Visitor};
use folio_model::{
    parser, Atom, Card, Image, ListSection, Marker, MarkupId, MarkupSection, Markuperable, ModelError, NodeId, Post,
};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Serialized document (JSON)
    pub doc: PathBuf,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let doc = read_document(&args.doc)?;
    let post = parser::parse(&doc)?;

    println!(
        "{} {} · {} sections",
        "post".bright_blue().bold(),
        doc.version,
        post.sections().len()
    );
    print!("{}", render_tree(&post)?);
    Ok(())
}

/// One line per section and leaf. Leaf sections carry their document-order
/// index, the address edit scripts and `trim` use.
pub fn render_tree(post: &Post) -> Result<String, ModelError> {
    let mut printer = TreePrinter::default();
    printer.visit_post(post);
    match printer.error {
        Some(e) => Err(e),
        None => Ok(printer.lines.join("\n") + "\n"),
    }
}

#[derive(Default)]
struct TreePrinter {
    lines: Vec<String>,
    depth: usize,
    leaf_index: usize,
    error: Option<ModelError>,
}

impl TreePrinter {
    fn line(&mut self, text: String) {
        self.lines.push(format!("{}{}", "  ".repeat(self.depth), text));
    }

    fn leaf_section(&mut self, label: String) {
        let index = format!("[{}]", self.leaf_index).dimmed();
        self.leaf_index += 1;
        self.line(format!("{index} {label}"));
    }

    fn nested(&mut self, post: &Post, id: NodeId) {
        self.depth += 1;
        walk_children(self, post, id);
        self.depth -= 1;
    }

    fn leaf(&mut self, post: &Post, id: NodeId, label: String) {
        match markup_deltas(post, id) {
            Ok(deltas) if deltas.is_empty() => self.line(label),
            Ok(deltas) => self.line(format!("{label} {deltas}")),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
    }
}

/// `+tag` for each markup the leaf opens, `-tag` for each it closes.
fn markup_deltas(post: &Post, leaf: NodeId) -> Result<String, ModelError> {
    let name = |id: MarkupId| post.markup(id).map(|m| m.tag_name());
    let mut parts = Vec::new();
    for id in post.opened_markups(leaf)? {
        parts.push(format!("+{}", name(id)?).green().to_string());
    }
    for id in post.closed_markups(leaf)? {
        parts.push(format!("-{}", name(id)?).red().to_string());
    }
    Ok(parts.join(" "))
}

impl Visitor for TreePrinter {
    fn visit_markup_section(&mut self, post: &Post, id: NodeId, section: &MarkupSection) {
        let mut label = section.tag.as_str().cyan().to_string();
        for (name, value) in &section.attributes {
            label.push_str(&format!(" {name}={value:?}"));
        }
        self.leaf_section(label);
        self.nested(post, id);
    }

    fn visit_list_section(&mut self, post: &Post, id: NodeId, list: &ListSection) {
        let mut label = list.tag.as_str().cyan().to_string();
        for (name, value) in &list.attributes {
            label.push_str(&format!(" {name}={value:?}"));
        }
        self.line(label);
        self.nested(post, id);
    }

    fn visit_list_item(&mut self, post: &Post, id: NodeId) {
        self.leaf_section("li".cyan().to_string());
        self.nested(post, id);
    }

    fn visit_card(&mut self, _post: &Post, _id: NodeId, card: &Card) {
        self.leaf_section(format!("{} {}", "card".magenta(), card.name()));
    }

    fn visit_image(&mut self, _post: &Post, _id: NodeId, image: &Image) {
        self.leaf_section(format!("{} {}", "img".magenta(), image.src));
    }

    fn visit_marker(&mut self, post: &Post, id: NodeId, marker: &Marker) {
        self.leaf(post, id, format!("{:?}", marker.text()));
    }

    fn visit_atom(&mut self, post: &Post, id: NodeId, atom: &Atom) {
        self.leaf(post, id, format!("@{}({:?})", atom.name(), atom.value()));
    }
}
