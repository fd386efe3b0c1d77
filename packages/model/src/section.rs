//! Block-level section payloads and their capability traits.
//!
//! Section kinds are plain structs; what they can do is expressed through
//! small traits ([`TagNameable`], [`Attributable`]) implemented per kind.
//! Ordered children (leaves or list items) live in the owning node's list,
//! see [`crate::node::Node`].

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attributes a markup or list section may carry.
pub const VALID_SECTION_ATTRIBUTES: &[&str] = &["data-md-text-align"];

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectionTag {
    #[default]
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Blockquote,
    Aside,
}

impl SectionTag {
    pub const ALL: [SectionTag; 9] = [
        SectionTag::P,
        SectionTag::H1,
        SectionTag::H2,
        SectionTag::H3,
        SectionTag::H4,
        SectionTag::H5,
        SectionTag::H6,
        SectionTag::Blockquote,
        SectionTag::Aside,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionTag::P => "p",
            SectionTag::H1 => "h1",
            SectionTag::H2 => "h2",
            SectionTag::H3 => "h3",
            SectionTag::H4 => "h4",
            SectionTag::H5 => "h5",
            SectionTag::H6 => "h6",
            SectionTag::Blockquote => "blockquote",
            SectionTag::Aside => "aside",
        }
    }
}

impl FromStr for SectionTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SectionTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| ModelError::InvalidSectionTag(s.to_string()))
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListTag {
    #[default]
    Ul,
    Ol,
}

impl ListTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ListTag::Ul => "ul",
            ListTag::Ol => "ol",
        }
    }
}

impl FromStr for ListTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ul" => Ok(ListTag::Ul),
            "ol" => Ok(ListTag::Ol),
            _ => Err(ModelError::InvalidSectionTag(s.to_string())),
        }
    }
}

impl fmt::Display for ListTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any tag a markerable section can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTag {
    Section(SectionTag),
    List(ListTag),
}

impl BlockTag {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockTag::Section(tag) => tag.as_str(),
            BlockTag::List(tag) => tag.as_str(),
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, BlockTag::List(_))
    }
}

impl FromStr for BlockTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(tag) = s.parse::<ListTag>() {
            return Ok(BlockTag::List(tag));
        }
        s.parse::<SectionTag>().map(BlockTag::Section)
    }
}

impl From<SectionTag> for BlockTag {
    fn from(tag: SectionTag) -> Self {
        BlockTag::Section(tag)
    }
}

impl From<ListTag> for BlockTag {
    fn from(tag: ListTag) -> Self {
        BlockTag::List(tag)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait TagNameable {
    fn tag_name(&self) -> &'static str;
}

pub trait Attributable {
    fn attributes(&self) -> &Attributes;
    fn attributes_mut(&mut self) -> &mut Attributes;

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes().get(name).map(String::as_str)
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> ModelResult<()> {
        if !VALID_SECTION_ATTRIBUTES.contains(&name) {
            return Err(ModelError::InvalidAttribute(name.to_string()));
        }
        self.attributes_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        self.attributes_mut().remove(name).is_some()
    }
}

/// Keep only whitelisted section attributes.
pub fn filter_attributes(attributes: Attributes) -> Attributes {
    attributes
        .into_iter()
        .filter(|(name, _)| VALID_SECTION_ATTRIBUTES.contains(&name.as_str()))
        .collect()
}

/// Paragraph, heading or quote holding inline leaves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkupSection {
    pub tag: SectionTag,
    pub attributes: Attributes,
}

impl MarkupSection {
    pub fn new(tag: SectionTag, attributes: Attributes) -> Self {
        Self {
            tag,
            attributes: filter_attributes(attributes),
        }
    }
}

impl TagNameable for MarkupSection {
    fn tag_name(&self) -> &'static str {
        self.tag.as_str()
    }
}

impl Attributable for MarkupSection {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// A list item; always nested in a [`ListSection`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem;

impl TagNameable for ListItem {
    fn tag_name(&self) -> &'static str {
        "li"
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListSection {
    pub tag: ListTag,
    pub attributes: Attributes,
}

impl ListSection {
    pub fn new(tag: ListTag, attributes: Attributes) -> Self {
        Self {
            tag,
            attributes: filter_attributes(attributes),
        }
    }
}

impl TagNameable for ListSection {
    fn tag_name(&self) -> &'static str {
        self.tag.as_str()
    }
}

impl Attributable for ListSection {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardMode {
    #[default]
    Display,
    Edit,
}

/// Block-level opaque object rendered by an application-provided card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    name: String,
    payload: Value,
    initial_mode: CardMode,
    mode: CardMode,
}

impl Card {
    pub fn new(name: impl Into<String>, payload: Value, initial_mode: CardMode) -> Self {
        Self {
            name: name.into(),
            payload,
            initial_mode,
            mode: initial_mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    pub fn initial_mode(&self) -> CardMode {
        self.initial_mode
    }

    /// The mode the card is currently rendered in.
    pub fn mode(&self) -> CardMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CardMode) {
        self.mode = mode;
    }

    /// Copy that starts out in whatever mode this card is showing now.
    pub fn duplicate(&self) -> Card {
        Card::new(self.name.clone(), self.payload.clone(), self.mode)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    pub src: String,
}

impl Image {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_tag_parsing() {
        assert_eq!("H2".parse::<BlockTag>().unwrap(), BlockTag::Section(SectionTag::H2));
        assert_eq!("ol".parse::<BlockTag>().unwrap(), BlockTag::List(ListTag::Ol));
        assert!("li".parse::<BlockTag>().is_err());
        assert!("div".parse::<SectionTag>().is_err());
    }

    #[test]
    fn test_attribute_whitelist() {
        let mut section = MarkupSection::default();
        section.set_attribute("data-md-text-align", "center").unwrap();

        assert_eq!(section.attribute("data-md-text-align"), Some("center"));
        assert_eq!(
            section.set_attribute("style", "color: red"),
            Err(ModelError::InvalidAttribute("style".to_string()))
        );
        assert!(section.remove_attribute("data-md-text-align"));
    }

    #[test]
    fn test_card_duplicate_keeps_current_mode() {
        let mut card = Card::new("gallery", json!({"images": 3}), CardMode::Display);
        card.set_mode(CardMode::Edit);

        let copy = card.duplicate();
        assert_eq!(copy.initial_mode(), CardMode::Edit);
        assert_eq!(copy.mode(), CardMode::Edit);
        assert_eq!(copy.payload(), &json!({"images": 3}));
    }
}
