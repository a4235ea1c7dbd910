//! Bounded recency index
//!
//! Keys are kept in least-recently-used order in a slot arena with
//! index-based links, so promotion, removal of an arbitrary key and
//! removal of the oldest key are all O(1). The index never evicts on its
//! own: the owner checks [`LruIndex::is_full`] and calls
//! [`LruIndex::evict_oldest`] before inserting a new key.

use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

/// Node in the recency list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency-ordered map with a fixed capacity
pub(crate) struct LruIndex<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruIndex<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty index holding at most `capacity` keys
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True when inserting a new key requires an eviction first
    pub fn is_full(&self) -> bool {
        self.map.len() >= self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Promote `key` to most-recently-used. Returns false if absent.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.map.get(key) {
            Some(&idx) => {
                self.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    /// Look up and promote
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Look up mutably and promote
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_mut().map(|node| &mut node.value)
    }

    /// Look up without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Insert a new key at the most-recently-used position.
    ///
    /// `key` must not already be present. Never evicts; a new key on a
    /// full index pushes `len` one past capacity until the caller evicts.
    pub fn insert(&mut self, key: K, value: V) {
        debug_assert!(!self.map.contains_key(&key), "key already in recency index");

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.link_front(idx);
        self.map.insert(key, idx);
    }

    /// Remove and return the least-recently-used entry
    pub fn evict_oldest(&mut self) -> Option<(K, V)> {
        let idx = self.tail?;
        self.take_node(idx)
    }

    /// Remove `key` wherever it sits in the order
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let idx = *self.map.get(key)?;
        self.take_node(idx)
    }

    /// Remove every entry, returned most-recent first
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut drained = Vec::with_capacity(self.map.len());
        while let Some(idx) = self.head {
            match self.take_node(idx) {
                Some(entry) => drained.push(entry),
                None => break,
            }
        }

        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        drained
    }

    /// Iterate from most- to least-recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            next: self.head,
            remaining: self.map.len(),
        }
    }

    fn take_node(&mut self, idx: usize) -> Option<(K, V)> {
        // Unlink while the node is still in place so its neighbours can be read.
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        self.free_node(idx);
        Some((node.key, node.value))
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);
        self.link_front(idx);
    }

    fn link_front(&mut self, idx: usize) {
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }

    /// Walk the list both ways and confirm it agrees with the map
    #[cfg(test)]
    fn check_invariants(&self) {
        let forward: Vec<usize> = {
            let mut out = Vec::new();
            let mut cur = self.head;
            while let Some(idx) = cur {
                out.push(idx);
                cur = self.nodes[idx].as_ref().and_then(|n| n.next);
                assert!(out.len() <= self.nodes.len(), "cycle in recency list");
            }
            out
        };
        let mut backward = Vec::new();
        let mut cur = self.tail;
        while let Some(idx) = cur {
            backward.push(idx);
            cur = self.nodes[idx].as_ref().and_then(|n| n.prev);
            assert!(backward.len() <= self.nodes.len(), "cycle in recency list");
        }
        backward.reverse();

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), self.map.len());
        for idx in forward {
            let node = self.nodes[idx].as_ref().expect("linked slot is empty");
            assert_eq!(self.map.get(&node.key), Some(&idx));
        }
    }
}

/// Iterator over `(key, value)` pairs, most-recent first
pub(crate) struct Iter<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    next: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.nodes[idx].as_ref()?;
        self.next = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
