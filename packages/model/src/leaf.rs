//! Inline leaves: text markers and atoms.
//!
//! Both kinds carry an ordered markup stack and a length measured in UTF-16
//! code units. A [`Marker`] is a run of text; an [`Atom`] is an opaque,
//! application-defined inline object that always occupies one unit.

use crate::error::{ModelError, ModelResult};
use crate::markup::MarkupId;
use serde_json::Value;
use std::ops::RangeInclusive;

pub const HIGH_SURROGATE_RANGE: RangeInclusive<u16> = 0xD800..=0xDBFF;
pub const LOW_SURROGATE_RANGE: RangeInclusive<u16> = 0xDC00..=0xDFFF;

pub fn is_high_surrogate(unit: u16) -> bool {
    HIGH_SURROGATE_RANGE.contains(&unit)
}

pub fn is_low_surrogate(unit: u16) -> bool {
    LOW_SURROGATE_RANGE.contains(&unit)
}

/// Behaviour shared by every leaf that can carry markups.
pub trait Markuperable {
    fn markups(&self) -> &[MarkupId];
    fn markups_mut(&mut self) -> &mut Vec<MarkupId>;

    /// Length in UTF-16 code units
    fn length(&self) -> usize;

    fn text(&self) -> String;

    fn is_blank(&self) -> bool {
        self.length() == 0
    }

    fn has_markup(&self, markup: MarkupId) -> bool {
        self.markups().contains(&markup)
    }

    fn add_markup(&mut self, markup: MarkupId) {
        if !self.has_markup(markup) {
            self.markups_mut().push(markup);
        }
    }

    /// Insert `markup` into the stack at `index` (clamped to the stack size).
    fn add_markup_at_index(&mut self, markup: MarkupId, index: usize) {
        if !self.has_markup(markup) {
            let markups = self.markups_mut();
            let index = index.min(markups.len());
            markups.insert(index, markup);
        }
    }

    fn remove_markup(&mut self, markup: MarkupId) -> bool {
        let markups = self.markups_mut();
        let before = markups.len();
        markups.retain(|m| *m != markup);
        markups.len() != before
    }

    fn clear_markups(&mut self) {
        self.markups_mut().clear();
    }
}

/// A run of text with a markup stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Marker {
    value: Vec<u16>,
    markups: Vec<MarkupId>,
}

impl Marker {
    pub fn new(text: &str, markups: Vec<MarkupId>) -> Self {
        Self {
            value: text.encode_utf16().collect(),
            markups,
        }
    }

    pub fn from_code_units(value: Vec<u16>, markups: Vec<MarkupId>) -> Self {
        Self { value, markups }
    }

    pub fn blank(markups: Vec<MarkupId>) -> Self {
        Self {
            value: Vec::new(),
            markups,
        }
    }

    pub fn value(&self) -> &[u16] {
        &self.value
    }

    pub fn set_text(&mut self, text: &str) {
        self.value = text.encode_utf16().collect();
    }

    pub fn set_value(&mut self, value: Vec<u16>) {
        self.value = value;
    }

    pub fn prepend_value(&mut self, units: &[u16]) {
        let mut value = units.to_vec();
        value.extend_from_slice(&self.value);
        self.value = value;
    }

    pub fn append_value(&mut self, units: &[u16]) {
        self.value.extend_from_slice(units);
    }

    pub fn code_unit_at(&self, offset: usize) -> Option<u16> {
        self.value.get(offset).copied()
    }

    pub fn text_until(&self, offset: usize) -> String {
        let end = offset.min(self.value.len());
        String::from_utf16_lossy(&self.value[..end])
    }

    /// Same markups, text restricted to `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> ModelResult<Marker> {
        self.check_range(start, end)?;
        Ok(Marker::from_code_units(
            self.value[start..end].to_vec(),
            self.markups.clone(),
        ))
    }

    /// Delete the single character at `offset`.
    ///
    /// When `offset` lands on either half of a surrogate pair, both halves
    /// are removed. Returns the number of code units deleted.
    pub fn delete_value_at_offset(&mut self, offset: usize) -> ModelResult<usize> {
        if offset >= self.value.len() {
            return Err(ModelError::out_of_bounds(offset, self.value.len()));
        }

        let unit = self.value[offset];
        let (start, width) = if is_high_surrogate(unit)
            && self.value.get(offset + 1).copied().is_some_and(is_low_surrogate)
        {
            (offset, 2)
        } else if is_low_surrogate(unit)
            && offset > 0
            && is_high_surrogate(self.value[offset - 1])
        {
            (offset - 1, 2)
        } else {
            (offset, 1)
        };

        self.value.drain(start..start + width);
        Ok(width)
    }

    /// Delete the code units in `start..end`.
    pub fn delete_value(&mut self, start: usize, end: usize) -> ModelResult<()> {
        self.check_range(start, end)?;
        self.value.drain(start..end);
        Ok(())
    }

    /// Split into `[..offset, offset..end, end..]`, each keeping the markups.
    pub fn split(&self, offset: usize, end: usize) -> ModelResult<[Marker; 3]> {
        self.check_range(offset, end)?;
        Ok([
            Marker::from_code_units(self.value[..offset].to_vec(), self.markups.clone()),
            Marker::from_code_units(self.value[offset..end].to_vec(), self.markups.clone()),
            Marker::from_code_units(self.value[end..].to_vec(), self.markups.clone()),
        ])
    }

    pub fn split_at_offset(&self, offset: usize) -> ModelResult<(Marker, Marker)> {
        self.check_range(offset, self.value.len())?;
        Ok((
            Marker::from_code_units(self.value[..offset].to_vec(), self.markups.clone()),
            Marker::from_code_units(self.value[offset..].to_vec(), self.markups.clone()),
        ))
    }

    fn check_range(&self, start: usize, end: usize) -> ModelResult<()> {
        if end > self.value.len() {
            return Err(ModelError::out_of_bounds(end, self.value.len()));
        }
        if start > end {
            return Err(ModelError::out_of_bounds(start, end));
        }
        Ok(())
    }
}

impl Markuperable for Marker {
    fn markups(&self) -> &[MarkupId] {
        &self.markups
    }

    fn markups_mut(&mut self) -> &mut Vec<MarkupId> {
        &mut self.markups
    }

    fn length(&self) -> usize {
        self.value.len()
    }

    fn text(&self) -> String {
        String::from_utf16_lossy(&self.value)
    }
}

/// An opaque inline object with an application-defined value and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    name: String,
    value: String,
    payload: Value,
    markups: Vec<MarkupId>,
}

impl Atom {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        payload: Value,
        markups: Vec<MarkupId>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            payload,
            markups,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Split around the atom; the blank marker pieces keep the markups.
    pub fn split_at_offset(&self, offset: usize) -> ModelResult<(Leaf, Leaf)> {
        let blank = Leaf::Marker(Marker::blank(self.markups.clone()));
        match offset {
            0 => Ok((blank, Leaf::Atom(self.clone()))),
            1 => Ok((Leaf::Atom(self.clone()), blank)),
            _ => Err(ModelError::out_of_bounds(offset, 1)),
        }
    }

    pub fn split(&self, offset: usize, end: usize) -> ModelResult<Vec<Leaf>> {
        if end > 1 || offset > end {
            return Err(ModelError::out_of_bounds(end.max(offset), 1));
        }
        let mut pieces = Vec::with_capacity(2);
        if end == 0 {
            pieces.push(Leaf::Marker(Marker::blank(self.markups.clone())));
        }
        pieces.push(Leaf::Atom(self.clone()));
        if offset == 1 {
            pieces.push(Leaf::Marker(Marker::blank(self.markups.clone())));
        }
        Ok(pieces)
    }
}

impl Markuperable for Atom {
    fn markups(&self) -> &[MarkupId] {
        &self.markups
    }

    fn markups_mut(&mut self) -> &mut Vec<MarkupId> {
        &mut self.markups
    }

    fn length(&self) -> usize {
        1
    }

    fn text(&self) -> String {
        self.value.clone()
    }

    fn is_blank(&self) -> bool {
        false
    }
}

/// Either kind of inline leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Marker(Marker),
    Atom(Atom),
}

impl Leaf {
    pub fn is_marker(&self) -> bool {
        matches!(self, Leaf::Marker(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Leaf::Atom(_))
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Leaf::Marker(marker) => Some(marker),
            Leaf::Atom(_) => None,
        }
    }

    pub fn as_marker_mut(&mut self) -> Option<&mut Marker> {
        match self {
            Leaf::Marker(marker) => Some(marker),
            Leaf::Atom(_) => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Leaf::Atom(atom) => Some(atom),
            Leaf::Marker(_) => None,
        }
    }

    /// Two markers with identical markup stacks can merge; atoms never merge.
    pub fn can_join(&self, other: &Leaf) -> bool {
        match (self, other) {
            (Leaf::Marker(a), Leaf::Marker(b)) => a.markups == b.markups,
            _ => false,
        }
    }

    pub fn split_at_offset(&self, offset: usize) -> ModelResult<(Leaf, Leaf)> {
        match self {
            Leaf::Marker(marker) => {
                let (pre, post) = marker.split_at_offset(offset)?;
                Ok((Leaf::Marker(pre), Leaf::Marker(post)))
            }
            Leaf::Atom(atom) => atom.split_at_offset(offset),
        }
    }

    pub fn split(&self, offset: usize, end: usize) -> ModelResult<Vec<Leaf>> {
        match self {
            Leaf::Marker(marker) => Ok(marker
                .split(offset, end)?
                .into_iter()
                .map(Leaf::Marker)
                .collect()),
            Leaf::Atom(atom) => atom.split(offset, end),
        }
    }
}

impl Markuperable for Leaf {
    fn markups(&self) -> &[MarkupId] {
        match self {
            Leaf::Marker(marker) => marker.markups(),
            Leaf::Atom(atom) => atom.markups(),
        }
    }

    fn markups_mut(&mut self) -> &mut Vec<MarkupId> {
        match self {
            Leaf::Marker(marker) => marker.markups_mut(),
            Leaf::Atom(atom) => atom.markups_mut(),
        }
    }

    fn length(&self) -> usize {
        match self {
            Leaf::Marker(marker) => marker.length(),
            Leaf::Atom(atom) => atom.length(),
        }
    }

    fn text(&self) -> String {
        match self {
            Leaf::Marker(marker) => marker.text(),
            Leaf::Atom(atom) => atom.text(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Leaf::Marker(marker) => marker.is_blank(),
            Leaf::Atom(atom) => atom.is_blank(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(raw: &[u32]) -> Vec<MarkupId> {
        raw.iter().map(|id| MarkupId(*id)).collect()
    }

    #[test]
    fn test_length_counts_code_units() {
        let marker = Marker::new("a😀b", vec![]);
        assert_eq!(marker.length(), 4);
        assert_eq!(marker.text(), "a😀b");
    }

    #[test]
    fn test_delete_value_at_offset_plain() {
        let mut marker = Marker::new("Howdy!", vec![]);
        assert_eq!(marker.delete_value_at_offset(5).unwrap(), 1);
        assert_eq!(marker.text(), "Howdy");
    }

    #[test]
    fn test_delete_value_at_offset_surrogate_pair() {
        // Landing on the high half
        let mut marker = Marker::new("a😀b", vec![]);
        assert_eq!(marker.delete_value_at_offset(1).unwrap(), 2);
        assert_eq!(marker.text(), "ab");

        // Landing on the low half
        let mut marker = Marker::new("a😀b", vec![]);
        assert_eq!(marker.delete_value_at_offset(2).unwrap(), 2);
        assert_eq!(marker.text(), "ab");
    }

    #[test]
    fn test_delete_value_at_offset_out_of_bounds() {
        let mut marker = Marker::new("ab", vec![]);
        assert!(marker.delete_value_at_offset(2).is_err());
    }

    #[test]
    fn test_split_keeps_markups() {
        let marker = Marker::new("abcdef", ids(&[1, 2]));
        let [pre, mid, post] = marker.split(2, 4).unwrap();

        assert_eq!(pre.text(), "ab");
        assert_eq!(mid.text(), "cd");
        assert_eq!(post.text(), "ef");
        assert_eq!(post.markups(), &ids(&[1, 2])[..]);
    }

    #[test]
    fn test_atom_split_at_offset() {
        let atom = Atom::new("mention", "@bob", json!({"id": 1}), ids(&[3]));

        let (pre, post) = atom.split_at_offset(0).unwrap();
        assert!(pre.is_blank() && pre.is_marker());
        assert!(post.is_atom());
        assert_eq!(pre.markups(), &ids(&[3])[..]);

        let (pre, post) = atom.split_at_offset(1).unwrap();
        assert!(pre.is_atom());
        assert!(post.is_blank());
    }

    #[test]
    fn test_can_join() {
        let a = Leaf::Marker(Marker::new("a", ids(&[1])));
        let b = Leaf::Marker(Marker::new("b", ids(&[1])));
        let c = Leaf::Marker(Marker::new("c", ids(&[2])));
        let atom = Leaf::Atom(Atom::new("x", "x", Value::Null, ids(&[1])));

        assert!(a.can_join(&b));
        assert!(!a.can_join(&c));
        assert!(!a.can_join(&atom));
        assert!(!atom.can_join(&a));
    }

    #[test]
    fn test_add_markup_at_index() {
        let mut marker = Marker::new("a", ids(&[1, 2]));
        marker.add_markup_at_index(MarkupId(9), 1);
        assert_eq!(marker.markups(), &ids(&[1, 9, 2])[..]);

        // Already present: unchanged
        marker.add_markup_at_index(MarkupId(9), 0);
        assert_eq!(marker.markups(), &ids(&[1, 9, 2])[..]);

        assert!(marker.remove_markup(MarkupId(1)));
        assert!(!marker.remove_markup(MarkupId(1)));
    }
}
