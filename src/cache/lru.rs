//! Recency List Module
//!
//! Doubly linked list for LRU ordering, stored in a slab of slots linked by index.

// == Slot Indices ==
/// Sentinel slot before the most recently used node.
const HEAD: usize = 0;
/// Sentinel slot after the least recently used node.
const TAIL: usize = 1;
/// Link value of a node that is not in the list.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<T> {
    /// None for sentinels and free slots
    value: Option<T>,
    prev: usize,
    next: usize,
}

impl<T> Node<T> {
    fn unlinked(value: Option<T>) -> Self {
        Self {
            value,
            prev: NIL,
            next: NIL,
        }
    }
}

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// Nodes live in a `Vec` and refer to each other by slot index, so the owning
/// map can hold plain `usize` handles instead of aliasing references.
/// - `HEAD.next` = most recently used
/// - `TAIL.prev` = least recently used
#[derive(Debug)]
pub struct RecencyList<T> {
    nodes: Vec<Node<T>>,
    /// Vacated slots available for reuse
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates an empty list holding only the two sentinels.
    pub fn new() -> Self {
        let mut list = Self {
            nodes: Vec::with_capacity(2),
            free: Vec::new(),
            len: 0,
        };
        list.nodes.push(Node::unlinked(None));
        list.nodes.push(Node::unlinked(None));
        list.nodes[HEAD].next = TAIL;
        list.nodes[TAIL].prev = HEAD;
        list
    }

    // == Push Front ==
    /// Inserts a value as most recently used and returns its slot handle.
    pub fn push_front(&mut self, value: T) -> usize {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Node::unlinked(Some(value));
                idx
            }
            None => {
                self.nodes.push(Node::unlinked(Some(value)));
                self.nodes.len() - 1
            }
        };
        self.link_after_head(idx);
        self.len += 1;
        idx
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    pub fn move_to_front(&mut self, idx: usize) {
        if !self.is_linked(idx) || self.nodes[HEAD].next == idx {
            return;
        }
        self.unlink(idx);
        self.link_after_head(idx);
    }

    // == Remove ==
    /// Unlinks a node, frees its slot and returns the value.
    pub fn remove(&mut self, idx: usize) -> Option<T> {
        if !self.is_linked(idx) {
            return None;
        }
        self.unlink(idx);
        self.len -= 1;
        self.free.push(idx);
        self.nodes[idx].value.take()
    }

    // == Pop Back ==
    /// Removes and returns the least recently used value with its old handle.
    pub fn pop_back(&mut self) -> Option<(usize, T)> {
        let idx = self.nodes[TAIL].prev;
        if idx == HEAD {
            return None;
        }
        self.remove(idx).map(|value| (idx, value))
    }

    /// Returns the value stored in a linked slot.
    pub fn get(&self, idx: usize) -> Option<&T> {
        if !self.is_linked(idx) {
            return None;
        }
        self.nodes[idx].value.as_ref()
    }

    /// Returns the value stored in a linked slot mutably.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        if !self.is_linked(idx) {
            return None;
        }
        self.nodes[idx].value.as_mut()
    }

    // == Clear ==
    /// Drops every value and resets to `HEAD <-> TAIL`.
    pub fn clear(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.free.clear();
        self.len = 0;
    }

    // == Length ==
    /// Returns the number of real (non-sentinel) nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates `(handle, value)` from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.nodes[HEAD].next,
        }
    }

    /// Handles from least to most recently used, walking `prev` links.
    pub fn handles_from_back(&self) -> Vec<usize> {
        let mut handles = Vec::with_capacity(self.len);
        let mut cursor = self.nodes[TAIL].prev;
        while cursor != HEAD && cursor != NIL {
            handles.push(cursor);
            cursor = self.nodes[cursor].prev;
        }
        handles
    }

    fn is_linked(&self, idx: usize) -> bool {
        idx > TAIL
            && idx < self.nodes.len()
            && self.nodes[idx].prev != NIL
            && self.nodes[idx].next != NIL
    }

    fn link_after_head(&mut self, idx: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

// == Iterator ==
/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == TAIL || self.cursor == NIL {
            return None;
        }
        let idx = self.cursor;
        let node = &self.list.nodes[idx];
        self.cursor = node.next;
        node.value.as_ref().map(|value| (idx, value))
    }
}
