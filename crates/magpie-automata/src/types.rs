//! Utility types.

use std::{collections::VecDeque, hash::Hash};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A FIFO worklist that accepts every distinct value at most once over its
/// lifetime. Re-pushing a value that was already queued or already drained is
/// a no-op, which is what makes the closure computations terminate.
#[derive(Debug)]
pub struct Queue<T> {
    queue: VecDeque<T>,
    seen: Set<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            seen: Set::default(),
        }
    }
}

impl<T> Queue<T>
where
    T: Clone + Eq + Hash,
{
    /// Enqueue a value, unless it has been enqueued before.
    pub fn push(&mut self, value: T) -> bool {
        if self.seen.insert(value.clone()) {
            self.queue.push_back(value);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }
}
