use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
};

pub const HANDLED_ITEMS_CAPACITY: usize = 512;

#[derive(Debug, Default)]
struct Inner {
    order: VecDeque<i64>,
    lookup: HashSet<i64>,
}

/// Bounded set of upload item ids that were already handed to the deletion queue.
///
/// When full, the oldest id is evicted first.
#[derive(Debug)]
pub struct HandledItems {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Default for HandledItems {
    fn default() -> Self {
        Self::with_capacity(HANDLED_ITEMS_CAPACITY)
    }
}

impl HandledItems {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn contains(&self, item_id: i64) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .lookup
            .contains(&item_id)
    }

    pub fn mark(&self, item_id: i64) {
        self.try_reserve(item_id);
    }

    /// Inserts the id unless it is already present. Returns `true` when this call inserted it.
    pub fn try_reserve(&self, item_id: i64) -> bool {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !inner.lookup.insert(item_id) {
            return false;
        }
        inner.order.push_back(item_id);
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.lookup.remove(&evicted);
            }
        }
        true
    }

    pub fn release(&self, item_id: i64) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.lookup.remove(&item_id) {
            inner.order.retain(|id| *id != item_id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let handled = HandledItems::with_capacity(3);
        for id in 1..=3 {
            handled.mark(id);
        }
        handled.mark(2);
        assert_eq!(handled.len(), 3);

        handled.mark(4);
        assert!(!handled.contains(1));
        assert!(handled.contains(2));
        assert!(handled.contains(3));
        assert!(handled.contains(4));
    }

    #[test]
    fn test_default_capacity() {
        let handled = HandledItems::default();
        for id in 0..(HANDLED_ITEMS_CAPACITY as i64 + 10) {
            handled.mark(id);
        }
        assert_eq!(handled.len(), HANDLED_ITEMS_CAPACITY);
        assert!(!handled.contains(9));
        assert!(handled.contains(10));
    }

    #[test]
    fn test_try_reserve_only_once() {
        let handled = HandledItems::with_capacity(4);
        assert!(handled.try_reserve(7));
        assert!(!handled.try_reserve(7));
        assert_eq!(handled.len(), 1);
    }

    #[test]
    fn test_release_allows_new_reservation() {
        let handled = HandledItems::with_capacity(2);
        assert!(handled.try_reserve(1));
        assert!(handled.try_reserve(2));
        handled.release(1);
        assert!(!handled.contains(1));
        assert_eq!(handled.len(), 1);

        assert!(handled.try_reserve(1));
        assert!(handled.try_reserve(3));
        // 2 is now the oldest
        assert!(!handled.contains(2));
        assert!(handled.contains(1));
        assert!(handled.contains(3));

        handled.release(42);
        assert_eq!(handled.len(), 2);
    }
}
