//! Inline formatting markups.
//!
//! A [`Markup`] is an immutable tag plus attributes. Markups are stored in a
//! per-post table and referenced by [`MarkupId`]; attribute-less markups are
//! interned by the post's builder, so comparing ids answers "is this the
//! same markup" for them.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attributes a markup may carry. Anything else is dropped on construction.
pub const VALID_MARKUP_ATTRIBUTES: &[&str] = &["href", "rel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkupId(pub(crate) u32);

impl MarkupId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MarkupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "markup#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupTag {
    A,
    B,
    Code,
    Em,
    I,
    S,
    Strong,
    Sub,
    Sup,
    U,
}

impl MarkupTag {
    pub const ALL: [MarkupTag; 10] = [
        MarkupTag::A,
        MarkupTag::B,
        MarkupTag::Code,
        MarkupTag::Em,
        MarkupTag::I,
        MarkupTag::S,
        MarkupTag::Strong,
        MarkupTag::Sub,
        MarkupTag::Sup,
        MarkupTag::U,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MarkupTag::A => "a",
            MarkupTag::B => "b",
            MarkupTag::Code => "code",
            MarkupTag::Em => "em",
            MarkupTag::I => "i",
            MarkupTag::S => "s",
            MarkupTag::Strong => "strong",
            MarkupTag::Sub => "sub",
            MarkupTag::Sup => "sup",
            MarkupTag::U => "u",
        }
    }
}

impl FromStr for MarkupTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        MarkupTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| ModelError::InvalidMarkupTag(s.to_string()))
    }
}

impl fmt::Display for MarkupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    tag: MarkupTag,
    attributes: Vec<(String, String)>,
}

impl Markup {
    /// Build a markup, keeping only whitelisted attributes in their given order.
    pub fn new(tag: MarkupTag, attributes: Vec<(String, String)>) -> Self {
        let attributes = attributes
            .into_iter()
            .filter(|(name, _)| VALID_MARKUP_ATTRIBUTES.contains(&name.as_str()))
            .collect();
        Self { tag, attributes }
    }

    pub fn parse(tag: &str, attributes: Vec<(String, String)>) -> ModelResult<Self> {
        Ok(Self::new(tag.parse()?, attributes))
    }

    pub fn tag(&self) -> MarkupTag {
        self.tag
    }

    pub fn tag_name(&self) -> &'static str {
        self.tag.as_str()
    }

    pub fn has_tag(&self, tag: MarkupTag) -> bool {
        self.tag == tag
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Text typed directly after this markup continues it.
    ///
    /// Links stop at their end, everything else keeps going.
    pub fn is_forward_inclusive(&self) -> bool {
        self.tag != MarkupTag::A
    }

    /// Text typed directly before this markup joins it.
    pub fn is_backward_inclusive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_whitelist() {
        assert_eq!("STRONG".parse::<MarkupTag>().unwrap(), MarkupTag::Strong);
        assert_eq!(
            "blink".parse::<MarkupTag>(),
            Err(ModelError::InvalidMarkupTag("blink".to_string()))
        );
    }

    #[test]
    fn test_attributes_are_filtered() {
        let markup = Markup::new(
            MarkupTag::A,
            vec![
                ("href".to_string(), "https://example.com".to_string()),
                ("onclick".to_string(), "alert(1)".to_string()),
            ],
        );

        assert_eq!(markup.attribute("href"), Some("https://example.com"));
        assert_eq!(markup.attribute("onclick"), None);
        assert_eq!(markup.attributes().len(), 1);
    }

    #[test]
    fn test_inclusivity() {
        let bold = Markup::new(MarkupTag::B, vec![]);
        let link = Markup::new(MarkupTag::A, vec![]);

        assert!(bold.is_forward_inclusive());
        assert!(!link.is_forward_inclusive());
        assert!(!bold.is_backward_inclusive());
    }
}
