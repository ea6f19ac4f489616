//! # Dependency Graph
//!
//! Trigger → dependent edges for the constructible model.
//!
//! A mutation of a trigger element flushes (clears, without recomputing) the
//! memoized values of the trigger itself and of every transitive dependent.
//! The walk is breadth-first with a visited set, so each element is flushed
//! exactly once per mutation even in diamond-shaped or cyclic graphs.
//! Recomputation happens on the next read.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Directed trigger → dependent edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    /// trigger → dependents in insertion order
    edges: BTreeMap<K, Vec<K>>,
}

impl<K> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy + std::fmt::Debug> DependencyGraph<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` must be flushed whenever `trigger` changes.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_dependency(&mut self, trigger: K, dependent: K) -> bool {
        let dependents = self.edges.entry(trigger).or_default();
        if dependents.contains(&dependent) {
            return false;
        }
        dependents.push(dependent);
        true
    }

    /// Drop one edge. Returns `true` if it existed.
    pub fn remove_dependency(&mut self, trigger: K, dependent: K) -> bool {
        let Some(dependents) = self.edges.get_mut(&trigger) else {
            return false;
        };
        let before = dependents.len();
        dependents.retain(|d| *d != dependent);
        let removed = dependents.len() != before;
        if dependents.is_empty() {
            self.edges.remove(&trigger);
        }
        removed
    }

    /// Direct dependents of `trigger`.
    #[must_use]
    pub fn dependents(&self, trigger: K) -> &[K] {
        match self.edges.get(&trigger) {
            Some(dependents) => dependents,
            None => &[],
        }
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// `trigger` followed by its transitive dependents, breadth-first, each
    /// exactly once.
    #[must_use]
    pub fn invalidation_order(&self, trigger: K) -> Vec<K> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();

        queue.push_back(trigger);
        visited.insert(trigger);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for dependent in self.dependents(current) {
                if visited.insert(*dependent) {
                    queue.push_back(*dependent);
                }
            }
        }
        order
    }

    /// Apply a field write to `target`, then flush everything it invalidates.
    ///
    /// `write` performs the assignment and may return a new trigger: the
    /// element the written value refers to. An edge from that element to
    /// `trigger` is installed before the walk, so later changes of the new
    /// value also invalidate `trigger`.
    ///
    /// Returns the flushed elements in flush order.
    pub fn set_field<S: ?Sized>(
        &mut self,
        target: &mut S,
        trigger: K,
        write: impl FnOnce(&mut S) -> Option<K>,
        mut flush: impl FnMut(&mut S, K),
    ) -> Vec<K> {
        if let Some(new_trigger) = write(target) {
            self.add_dependency(new_trigger, trigger);
        }
        let order = self.invalidation_order(trigger);
        for element in &order {
            flush(target, *element);
        }
        tracing::debug!(trigger = ?trigger, flushed = order.len(), "invalidated dependents");
        order
    }
}

// =============================================================================
// TESTS
// =============================================================================
