use indexmap::IndexSet;

/// Work queue that remembers everything it has ever been given.
///
/// Items are handed out in insertion order and an item is only queued once,
/// so following references between files terminates even when they form a cycle.
pub struct SeenPendingCollection<T: std::hash::Hash + Eq + Clone> {
    inner: IndexSet<T>,
    next_index: usize,
}

impl<T: std::hash::Hash + Eq + Clone> Default for SeenPendingCollection<T> {
    fn default() -> Self {
        Self {
            inner: IndexSet::new(),
            next_index: 0,
        }
    }
}

impl<T: std::hash::Hash + Eq + Clone> SeenPendingCollection<T> {
    pub fn has_seen(&self, item: &T) -> bool {
        self.inner.contains(item)
    }

    /// Queues `item` unless it was seen before. Returns whether it was new.
    pub fn add(&mut self, item: T) -> bool {
        self.inner.insert(item)
    }

    pub fn next_pending(&mut self) -> Option<T> {
        let next = self.inner.get_index(self.next_index);
        if next.is_some() {
            self.next_index += 1;
        }
        next.cloned()
    }
}
