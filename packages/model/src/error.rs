use crate::linked_list::ListError;
use crate::node::NodeId;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("List error: {0}")]
    List(#[from] ListError),

    #[error("Invalid markup tag: {0}")]
    InvalidMarkupTag(String),

    #[error("Invalid section tag: {0}")]
    InvalidSectionTag(String),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Expected a leaf section, found {0}")]
    NotALeafSection(NodeId),

    #[error("Expected a markerable section, found {0}")]
    NotMarkerable(NodeId),

    #[error("Expected a marker or atom, found {0}")]
    NotALeaf(NodeId),

    #[error("Expected a list section, found {0}")]
    NotAListSection(NodeId),

    #[error("Expected a list item, found {0}")]
    NotAListItem(NodeId),

    #[error("Offset {offset} is out of bounds for length {length}")]
    OffsetOutOfBounds { offset: usize, length: usize },

    #[error("Offset {0} is not a marker boundary")]
    NotABoundary(usize),

    #[error("Position is blank")]
    BlankPosition,

    #[error("Range must not span multiple sections")]
    RangeSpansSections,

    #[error("No leaf section at index {0}")]
    LeafIndexOutOfBounds(usize),

    #[error("Unsupported serialization version: {0}")]
    UnsupportedVersion(String),

    #[error("Malformed serialized document: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ModelError {
    pub fn out_of_bounds(offset: usize, length: usize) -> Self {
        Self::OffsetOutOfBounds { offset, length }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}
