use std::collections::VecDeque;

/// Bounded FIFO between decode and one back-end resource class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQueue<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> IssueQueue<T> {
    /// Empty queue holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends at the tail, handing the entry back when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(entry)` when the queue already holds `capacity` entries.
    pub fn push(&mut self, entry: T) -> Result<(), T> {
        if self.is_full() {
            return Err(entry);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Removes the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// Oldest entry.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when a push would be refused.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::IssueQueue;

    #[test]
    fn entries_leave_in_arrival_order() {
        let mut queue = IssueQueue::new(3);
        for entry in 1..=3 {
            queue.push(entry).unwrap();
        }
        assert_eq!(queue.front(), Some(&1));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_returns_the_entry() {
        let mut queue = IssueQueue::new(1);
        queue.push('a').unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.push('b'), Err('b'));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.capacity(), 1);
    }
}
