//! Callback queues flushed when a session completes.

use folio_model::{NodeId, Post};
use std::fmt;

/// The three ordered queues, flushed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    /// Structural clean-up, while the tree may still change
    BeforeComplete,
    Complete,
    AfterComplete,
}

pub type Callback = Box<dyn FnOnce(&Post)>;

pub(crate) enum Deferred {
    /// Drop a list produced by a list split if it ended up empty
    PruneIfBlank(NodeId),
    /// Merge adjacent top-level lists sharing a tag
    JoinContiguousLists,
    Callback(Callback),
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::PruneIfBlank(list) => f.debug_tuple("PruneIfBlank").field(list).finish(),
            Deferred::JoinContiguousLists => f.write_str("JoinContiguousLists"),
            Deferred::Callback(_) => f.write_str("Callback"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CallbackQueues {
    before_complete: Vec<Deferred>,
    complete: Vec<Deferred>,
    after_complete: Vec<Deferred>,
}

impl CallbackQueues {
    fn queue_mut(&mut self, queue: Queue) -> &mut Vec<Deferred> {
        match queue {
            Queue::BeforeComplete => &mut self.before_complete,
            Queue::Complete => &mut self.complete,
            Queue::AfterComplete => &mut self.after_complete,
        }
    }

    pub(crate) fn push(&mut self, queue: Queue, deferred: Deferred) {
        self.queue_mut(queue).push(deferred);
    }

    /// Queue a list join at most once; a repeated request moves it to the
    /// back so it runs after every prune queued so far.
    pub(crate) fn push_join_once(&mut self, queue: Queue) {
        let entries = self.queue_mut(queue);
        entries.retain(|entry| !matches!(entry, Deferred::JoinContiguousLists));
        entries.push(Deferred::JoinContiguousLists);
    }

    pub(crate) fn take(&mut self, queue: Queue) -> Vec<Deferred> {
        std::mem::take(self.queue_mut(queue))
    }

    pub(crate) fn len(&self, queue: Queue) -> usize {
        match queue {
            Queue::BeforeComplete => self.before_complete.len(),
            Queue::Complete => self.complete.len(),
            Queue::AfterComplete => self.after_complete.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_queued_once_and_last() {
        let mut queues = CallbackQueues::default();
        let mut post = Post::new();
        let list = post.builder().create_list_section(Default::default(), vec![], Default::default()).unwrap();

        queues.push_join_once(Queue::BeforeComplete);
        queues.push(Queue::BeforeComplete, Deferred::PruneIfBlank(list));
        queues.push_join_once(Queue::BeforeComplete);

        let entries = queues.take(Queue::BeforeComplete);
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], Deferred::PruneIfBlank(_)));
        assert!(matches!(entries[1], Deferred::JoinContiguousLists));
        assert_eq!(queues.len(Queue::BeforeComplete), 0);
    }
}
