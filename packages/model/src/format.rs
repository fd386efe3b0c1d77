//! Serialized document format.
//!
//! ```text
//! {
//!   "version": "0.3.2",
//!   "atoms":   [[name, value, payload], ...],
//!   "cards":   [[name, payload], ...],
//!   "markups": [[tag] | [tag, [attr, value, ...]], ...],
//!   "sections": [
//!     [1, tag, [marker, ...], [attr, value, ...]?],   markup section
//!     [2, src],                                       image
//!     [3, tag, [[marker, ...], ...], [attr, ...]?],   list
//!     [10, card_index]                                card
//!   ]
//! }
//! marker = [0 | 1, [opened markup indexes], closed count, text | atom index]
//! ```
//!
//! Section attributes exist from `0.3.2` on.

use crate::error::{ModelError, ModelResult};
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const MARKUP_SECTION_TYPE: u8 = 1;
pub const IMAGE_SECTION_TYPE: u8 = 2;
pub const LIST_SECTION_TYPE: u8 = 3;
pub const CARD_SECTION_TYPE: u8 = 10;

pub const MARKUP_MARKER_TYPE: u8 = 0;
pub const ATOM_MARKER_TYPE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatVersion {
    V0_3_0,
    V0_3_1,
    #[default]
    V0_3_2,
}

impl FormatVersion {
    pub const ALL: [FormatVersion; 3] = [
        FormatVersion::V0_3_0,
        FormatVersion::V0_3_1,
        FormatVersion::V0_3_2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatVersion::V0_3_0 => "0.3.0",
            FormatVersion::V0_3_1 => "0.3.1",
            FormatVersion::V0_3_2 => "0.3.2",
        }
    }

    pub fn supports_section_attributes(self) -> bool {
        self == FormatVersion::V0_3_2
    }
}

impl FromStr for FormatVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatVersion::ALL
            .iter()
            .copied()
            .find(|version| version.as_str() == s)
            .ok_or_else(|| ModelError::UnsupportedVersion(s.to_string()))
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPost {
    pub version: FormatVersion,
    #[serde(default)]
    pub atoms: Vec<AtomEntry>,
    #[serde(default)]
    pub cards: Vec<CardEntry>,
    #[serde(default)]
    pub markups: Vec<MarkupEntry>,
    pub sections: Vec<SectionEntry>,
}

impl SerializedPost {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `[name, value, payload]`
pub type AtomEntry = (String, String, Value);

/// `[name, payload]`
pub type CardEntry = (String, Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkupEntry {
    /// `[tag, [name, value, ...]]`
    WithAttributes(String, Vec<String>),
    /// `[tag]`
    Plain((String,)),
}

impl MarkupEntry {
    pub fn tag(&self) -> &str {
        match self {
            MarkupEntry::WithAttributes(tag, _) | MarkupEntry::Plain((tag,)) => tag,
        }
    }

    pub fn attributes(&self) -> ModelResult<Vec<(String, String)>> {
        match self {
            MarkupEntry::WithAttributes(_, flat) => pairs(flat),
            MarkupEntry::Plain(_) => Ok(Vec::new()),
        }
    }
}

/// `[type, opened markup indexes, closed count, value]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEntry(pub u8, pub Vec<usize>, pub usize, pub Value);

impl MarkerEntry {
    pub fn text(opened: Vec<usize>, closed: usize, text: String) -> Self {
        Self(MARKUP_MARKER_TYPE, opened, closed, Value::String(text))
    }

    pub fn atom(opened: Vec<usize>, closed: usize, index: usize) -> Self {
        Self(ATOM_MARKER_TYPE, opened, closed, Value::from(index))
    }

    pub fn opened(&self) -> &[usize] {
        &self.1
    }

    pub fn closed(&self) -> usize {
        self.2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionEntry {
    Markup {
        tag: String,
        markers: Vec<MarkerEntry>,
        attributes: Option<Vec<String>>,
    },
    Image {
        src: String,
    },
    List {
        tag: String,
        items: Vec<Vec<MarkerEntry>>,
        attributes: Option<Vec<String>>,
    },
    Card {
        index: usize,
    },
}

impl Serialize for SectionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SectionEntry::Markup {
                tag,
                markers,
                attributes,
            } => {
                let mut seq = serializer.serialize_seq(Some(3 + usize::from(attributes.is_some())))?;
                seq.serialize_element(&MARKUP_SECTION_TYPE)?;
                seq.serialize_element(tag)?;
                seq.serialize_element(markers)?;
                if let Some(attributes) = attributes {
                    seq.serialize_element(attributes)?;
                }
                seq.end()
            }
            SectionEntry::Image { src } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&IMAGE_SECTION_TYPE)?;
                seq.serialize_element(src)?;
                seq.end()
            }
            SectionEntry::List {
                tag,
                items,
                attributes,
            } => {
                let mut seq = serializer.serialize_seq(Some(3 + usize::from(attributes.is_some())))?;
                seq.serialize_element(&LIST_SECTION_TYPE)?;
                seq.serialize_element(tag)?;
                seq.serialize_element(items)?;
                if let Some(attributes) = attributes {
                    seq.serialize_element(attributes)?;
                }
                seq.end()
            }
            SectionEntry::Card { index } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&CARD_SECTION_TYPE)?;
                seq.serialize_element(index)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SectionEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = Vec::<Value>::deserialize(deserializer)?.into_iter();

        fn next<T: serde::de::DeserializeOwned>(
            raw: &mut impl Iterator<Item = Value>,
            what: &str,
        ) -> Result<T, String> {
            let value = raw
                .next()
                .ok_or_else(|| format!("section is missing its {}", what))?;
            serde_json::from_value(value).map_err(|e| e.to_string())
        }

        let section_type: u8 = next(&mut raw, "type").map_err(D::Error::custom)?;
        let entry = match section_type {
            MARKUP_SECTION_TYPE => SectionEntry::Markup {
                tag: next(&mut raw, "tag").map_err(D::Error::custom)?,
                markers: next(&mut raw, "markers").map_err(D::Error::custom)?,
                attributes: raw
                    .next()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(D::Error::custom)?,
            },
            IMAGE_SECTION_TYPE => SectionEntry::Image {
                src: next(&mut raw, "src").map_err(D::Error::custom)?,
            },
            LIST_SECTION_TYPE => SectionEntry::List {
                tag: next(&mut raw, "tag").map_err(D::Error::custom)?,
                items: next(&mut raw, "items").map_err(D::Error::custom)?,
                attributes: raw
                    .next()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(D::Error::custom)?,
            },
            CARD_SECTION_TYPE => SectionEntry::Card {
                index: next(&mut raw, "card index").map_err(D::Error::custom)?,
            },
            other => return Err(D::Error::custom(format!("unknown section type {}", other))),
        };
        Ok(entry)
    }
}

/// `[a, 1, b, 2]` → `[(a, 1), (b, 2)]`
pub(crate) fn pairs(flat: &[String]) -> ModelResult<Vec<(String, String)>> {
    if flat.len() % 2 != 0 {
        return Err(ModelError::malformed("attribute list has an odd length"));
    }
    Ok(flat
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

pub(crate) fn flatten<'a>(attributes: impl IntoIterator<Item = (&'a String, &'a String)>) -> Vec<String> {
    attributes
        .into_iter()
        .flat_map(|(name, value)| [name.clone(), value.clone()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_entries_read_and_write_arrays() {
        let raw = json!([
            [1, "p", [[0, [0], 1, "bold"]]],
            [1, "h2", [], ["data-md-text-align", "center"]],
            [2, "https://example.com/cat.png"],
            [3, "ul", [[[0, [], 0, "item"]]]],
            [10, 0]
        ]);
        let sections: Vec<SectionEntry> = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(sections.len(), 5);
        assert!(matches!(&sections[1], SectionEntry::Markup { attributes: Some(a), .. } if a.len() == 2));
        assert_eq!(sections[4], SectionEntry::Card { index: 0 });
        assert_eq!(serde_json::to_value(&sections).unwrap(), raw);
    }

    #[test]
    fn test_markup_entries() {
        let entries: Vec<MarkupEntry> =
            serde_json::from_value(json!([["b"], ["a", ["href", "https://example.com"]]])).unwrap();

        assert_eq!(entries[0], MarkupEntry::Plain(("b".to_string(),)));
        assert_eq!(entries[1].tag(), "a");
        assert_eq!(
            entries[1].attributes().unwrap(),
            vec![("href".to_string(), "https://example.com".to_string())]
        );
    }

    #[test]
    fn test_unknown_version_and_section_type() {
        let doc = json!({"version": "0.2.0", "sections": []});
        assert!(serde_json::from_value::<SerializedPost>(doc).is_err());

        let section = json!([7, "x"]);
        assert!(serde_json::from_value::<SectionEntry>(section).is_err());
    }
}
