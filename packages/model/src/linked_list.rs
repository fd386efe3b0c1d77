//! # Intrusive Linked List
//!
//! Every ordered child collection in a post (top-level sections, list items,
//! the leaves of a markerable section) is a doubly-linked list whose links
//! live inside the nodes themselves.
//!
//! The list is generic over a handle type `K` and over the storage that
//! holds the links. Storage implements [`LinkedStore`] by exposing each
//! item's [`Link`] and each owner's [`ListHead`]; all list operations are
//! provided methods on that trait. Owners customise membership changes
//! through the `adopt`/`free` hooks.
//!
//! ```text
//!   owner ── head ─▶ [a] ⇄ [b] ⇄ [c] ◀─ tail
//!                     │     │     │
//!                     └─────┴─────┴── parent = owner
//! ```

use thiserror::Error;

/// Per-item link fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<K> {
    pub prev: Option<K>,
    pub next: Option<K>,
    /// The owner whose list currently contains this item
    pub parent: Option<K>,
}

impl<K> Default for Link<K> {
    fn default() -> Self {
        Self {
            prev: None,
            next: None,
            parent: None,
        }
    }
}

/// Per-owner list header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHead<K> {
    pub head: Option<K>,
    pub tail: Option<K>,
    pub length: usize,
}

impl<K> Default for ListHead<K> {
    fn default() -> Self {
        Self {
            head: None,
            tail: None,
            length: 0,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("Cannot insert an item that already belongs to a list")]
    AlreadyLinked,

    #[error("Cannot remove an item that belongs to a different list")]
    ForeignItem,

    #[error("Reference item is not a member of this list")]
    ReferenceNotInList,

    #[error("Range endpoints are not ordered members of this list")]
    InvalidRange,
}

/// Storage for intrusive lists keyed by handle `K`.
pub trait LinkedStore<K: Copy + Eq> {
    fn link(&self, item: K) -> &Link<K>;
    fn link_mut(&mut self, item: K) -> &mut Link<K>;
    fn list(&self, owner: K) -> &ListHead<K>;
    fn list_mut(&mut self, owner: K) -> &mut ListHead<K>;

    /// Invoked once `item` has been claimed by `owner`, before it is relinked.
    fn adopt(&mut self, _owner: K, _item: K) {}

    /// Invoked once `item` has been released by `owner`.
    fn free(&mut self, _owner: K, _item: K) {}

    /// Insert `item` before `reference`, or at the end when `reference` is `None`.
    fn insert_before(&mut self, owner: K, item: K, reference: Option<K>) -> Result<(), ListError> {
        if self.link(item).parent.is_some() {
            return Err(ListError::AlreadyLinked);
        }
        if let Some(reference) = reference {
            if self.link(reference).parent != Some(owner) {
                return Err(ListError::ReferenceNotInList);
            }
        }

        self.link_mut(item).parent = Some(owner);
        self.list_mut(owner).length += 1;
        self.adopt(owner, item);

        match reference {
            Some(reference) => {
                let prev = self.link(reference).prev;
                {
                    let link = self.link_mut(item);
                    link.prev = prev;
                    link.next = Some(reference);
                }
                self.link_mut(reference).prev = Some(item);
                match prev {
                    Some(prev) => self.link_mut(prev).next = Some(item),
                    None => self.list_mut(owner).head = Some(item),
                }
            }
            None => {
                let tail = self.list(owner).tail;
                {
                    let link = self.link_mut(item);
                    link.prev = tail;
                    link.next = None;
                }
                match tail {
                    Some(tail) => self.link_mut(tail).next = Some(item),
                    None => self.list_mut(owner).head = Some(item),
                }
                self.list_mut(owner).tail = Some(item);
            }
        }

        Ok(())
    }

    fn append(&mut self, owner: K, item: K) -> Result<(), ListError> {
        self.insert_before(owner, item, None)
    }

    fn prepend(&mut self, owner: K, item: K) -> Result<(), ListError> {
        let head = self.list(owner).head;
        self.insert_before(owner, item, head)
    }

    /// Insert `item` after `reference`, or at the front when `reference` is `None`.
    fn insert_after(&mut self, owner: K, item: K, reference: Option<K>) -> Result<(), ListError> {
        match reference {
            Some(reference) => {
                if self.link(reference).parent != Some(owner) {
                    return Err(ListError::ReferenceNotInList);
                }
                let next = self.link(reference).next;
                self.insert_before(owner, item, next)
            }
            None => self.prepend(owner, item),
        }
    }

    /// Unlink `item`. No-op when the item is in no list.
    fn remove(&mut self, owner: K, item: K) -> Result<(), ListError> {
        match self.link(item).parent {
            None => return Ok(()),
            Some(parent) if parent != owner => return Err(ListError::ForeignItem),
            Some(_) => {}
        }

        let Link { prev, next, .. } = *self.link(item);
        match prev {
            Some(prev) => self.link_mut(prev).next = next,
            None => self.list_mut(owner).head = next,
        }
        match next {
            Some(next) => self.link_mut(next).prev = prev,
            None => self.list_mut(owner).tail = prev,
        }
        *self.link_mut(item) = Link::default();
        self.list_mut(owner).length -= 1;
        self.free(owner, item);

        Ok(())
    }

    /// Remove `remove_count` items starting at `target`, then insert
    /// `new_items` where the removed run used to be.
    ///
    /// With a count of zero the new items land directly after `target`.
    fn splice(
        &mut self,
        owner: K,
        target: K,
        remove_count: usize,
        new_items: &[K],
    ) -> Result<(), ListError> {
        if self.link(target).parent != Some(owner) {
            return Err(ListError::ReferenceNotInList);
        }

        let mut current = Some(target);
        let mut next_item = self.link(target).next;
        let mut removed = 0;
        while let Some(item) = current {
            if removed >= remove_count {
                break;
            }
            next_item = self.link(item).next;
            self.remove(owner, item)?;
            removed += 1;
            current = next_item;
        }

        for item in new_items {
            self.insert_before(owner, *item, next_item)?;
        }
        Ok(())
    }

    /// Closed interval `start..=end` in list order.
    fn read_range(&self, owner: K, start: K, end: K) -> Result<Vec<K>, ListError> {
        if self.link(start).parent != Some(owner) || self.link(end).parent != Some(owner) {
            return Err(ListError::ReferenceNotInList);
        }
        let mut items = Vec::new();
        let mut current = Some(start);
        while let Some(item) = current {
            items.push(item);
            if item == end {
                return Ok(items);
            }
            current = self.link(item).next;
        }
        Err(ListError::InvalidRange)
    }

    fn first(&self, owner: K) -> Option<K> {
        self.list(owner).head
    }

    fn last(&self, owner: K) -> Option<K> {
        self.list(owner).tail
    }

    fn len(&self, owner: K) -> usize {
        self.list(owner).length
    }

    fn is_empty(&self, owner: K) -> bool {
        self.list(owner).head.is_none()
    }

    fn items(&self, owner: K) -> Vec<K> {
        let mut items = Vec::with_capacity(self.list(owner).length);
        let mut current = self.list(owner).head;
        while let Some(item) = current {
            items.push(item);
            current = self.link(item).next;
        }
        items
    }

    fn item_at(&self, owner: K, index: usize) -> Option<K> {
        let mut current = self.list(owner).head;
        let mut position = 0;
        while let Some(item) = current {
            if position == index {
                return Some(item);
            }
            position += 1;
            current = self.link(item).next;
        }
        None
    }

    fn index_of(&self, owner: K, target: K) -> Option<usize> {
        if self.link(target).parent != Some(owner) {
            return None;
        }
        let mut current = self.list(owner).head;
        let mut position = 0;
        while let Some(item) = current {
            if item == target {
                return Some(position);
            }
            position += 1;
            current = self.link(item).next;
        }
        None
    }

    /// First item at or after `start` (or from the head) matching `predicate`,
    /// walking backwards when `reverse` is set.
    fn detect(
        &self,
        owner: K,
        start: Option<K>,
        reverse: bool,
        mut predicate: impl FnMut(K) -> bool,
    ) -> Option<K>
    where
        Self: Sized,
    {
        let mut current = match (start, reverse) {
            (Some(start), _) => Some(start),
            (None, false) => self.list(owner).head,
            (None, true) => self.list(owner).tail,
        };
        while let Some(item) = current {
            if predicate(item) {
                return Some(item);
            }
            current = if reverse {
                self.link(item).prev
            } else {
                self.link(item).next
            };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestStore {
        links: Vec<Link<usize>>,
        lists: HashMap<usize, ListHead<usize>>,
        adopted: Vec<(usize, usize)>,
        freed: Vec<(usize, usize)>,
    }

    impl TestStore {
        fn with_items(count: usize) -> Self {
            let mut store = TestStore::default();
            store.links = vec![Link::default(); count];
            store
        }
    }

    impl LinkedStore<usize> for TestStore {
        fn link(&self, item: usize) -> &Link<usize> {
            &self.links[item]
        }
        fn link_mut(&mut self, item: usize) -> &mut Link<usize> {
            &mut self.links[item]
        }
        fn list(&self, owner: usize) -> &ListHead<usize> {
            static EMPTY: ListHead<usize> = ListHead {
                head: None,
                tail: None,
                length: 0,
            };
            self.lists.get(&owner).unwrap_or(&EMPTY)
        }
        fn list_mut(&mut self, owner: usize) -> &mut ListHead<usize> {
            self.lists.entry(owner).or_default()
        }
        fn adopt(&mut self, owner: usize, item: usize) {
            self.adopted.push((owner, item));
        }
        fn free(&mut self, owner: usize, item: usize) {
            self.freed.push((owner, item));
        }
    }

    #[test]
    fn test_append_and_order() {
        let mut store = TestStore::with_items(5);
        store.append(0, 1).unwrap();
        store.append(0, 2).unwrap();
        store.prepend(0, 3).unwrap();

        assert_eq!(store.items(0), vec![3, 1, 2]);
        assert_eq!(store.len(0), 3);
        assert_eq!(store.link(1).parent, Some(0));
        assert_eq!(store.adopted, vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn test_insert_fails_when_already_linked() {
        let mut store = TestStore::with_items(5);
        store.append(0, 1).unwrap();

        assert_eq!(store.append(4, 1), Err(ListError::AlreadyLinked));
        assert_eq!(store.append(0, 1), Err(ListError::AlreadyLinked));
    }

    #[test]
    fn test_remove_semantics() {
        let mut store = TestStore::with_items(6);
        store.append(0, 1).unwrap();
        store.append(0, 2).unwrap();
        store.append(5, 3).unwrap();

        // Not linked anywhere: no-op
        store.remove(0, 4).unwrap();
        // Linked elsewhere: error
        assert_eq!(store.remove(0, 3), Err(ListError::ForeignItem));

        store.remove(0, 1).unwrap();
        assert_eq!(store.items(0), vec![2]);
        assert_eq!(store.link(1), &Link::default());
        assert_eq!(store.freed, vec![(0, 1)]);
    }

    #[test]
    fn test_splice_replaces_run() {
        let mut store = TestStore::with_items(8);
        for item in 1..=4 {
            store.append(0, item).unwrap();
        }

        store.splice(0, 2, 2, &[6, 7]).unwrap();
        assert_eq!(store.items(0), vec![1, 6, 7, 4]);

        // Zero removal inserts after the target
        store.splice(0, 4, 0, &[5]).unwrap();
        assert_eq!(store.items(0), vec![1, 6, 7, 4, 5]);
    }

    #[test]
    fn test_read_range_is_closed() {
        let mut store = TestStore::with_items(6);
        for item in 1..=5 {
            store.append(0, item).unwrap();
        }

        assert_eq!(store.read_range(0, 2, 4).unwrap(), vec![2, 3, 4]);
        assert_eq!(store.read_range(0, 3, 3).unwrap(), vec![3]);
        assert_eq!(store.read_range(0, 4, 2), Err(ListError::InvalidRange));
    }

    #[test]
    fn test_positional_reads() {
        let mut store = TestStore::with_items(5);
        store.append(0, 1).unwrap();
        store.insert_after(0, 2, Some(1)).unwrap();
        store.insert_after(0, 3, None).unwrap();

        assert_eq!(store.items(0), vec![3, 1, 2]);
        assert_eq!(store.item_at(0, 1), Some(1));
        assert_eq!(store.item_at(0, 3), None);
        assert_eq!(store.index_of(0, 2), Some(2));
        assert_eq!(store.detect(0, None, true, |item| item != 2), Some(1));
    }
}
