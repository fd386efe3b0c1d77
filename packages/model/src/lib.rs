//! # Folio Model
//!
//! In-memory document model for the Folio editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Post: arena of nodes + markup table         │
//! │  - sections, list items, leaves by NodeId   │
//! │  - intrusive linked lists for children      │
//! │  - dirty / removal bookkeeping for renders  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Position / Range: (leaf section, offset)    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer / parser: versioned JSON format  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Structural editing sessions and history live in `folio-editor`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_model::{parser, serializer, FormatVersion, LinkedStore, Post, SectionTag};
//!
//! let mut post = Post::new();
//! let mut builder = post.builder();
//! let marker = builder.create_marker("Hello", vec![]);
//! let section = builder.create_markup_section(SectionTag::P, vec![marker], Default::default())?;
//! let root = post.root();
//! post.append(root, section)?;
//!
//! let json = serializer::serialize_to_string(&post, FormatVersion::V0_3_2)?;
//! let copy = parser::parse_str(&json)?;
//! ```

pub mod builder;
pub mod error;
pub mod format;
pub mod leaf;
pub mod linked_list;
pub mod markerable;
pub mod markup;
pub mod node;
pub mod parser;
pub mod position;
pub mod post;
pub mod range;
pub mod section;
pub mod serializer;
pub mod visitor;

pub use builder::Builder;
pub use error::{ModelError, ModelResult};
pub use format::{FormatVersion, SerializedPost};
pub use leaf::{Atom, Leaf, Marker, Markuperable};
pub use linked_list::{Link, LinkedStore, ListError, ListHead};
pub use markerable::{JoinSeam, LeafSlice, MarkerEdit, SectionUnit};
pub use markup::{Markup, MarkupId, MarkupTag};
pub use node::{Node, NodeId, NodeKind, NodeType};
pub use position::{Direction, Position};
pub use post::{Post, RenderWork};
pub use range::Range;
pub use section::{
    Attributable, Attributes, BlockTag, Card, CardMode, Image, ListItem, ListSection, ListTag, MarkupSection,
    SectionTag, TagNameable,
};
pub use visitor::Visitor;
