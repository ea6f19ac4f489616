//! # Memoizing Cache
//!
//! Per-property lazy value cache that tolerates cyclic computations.
//!
//! ## State machine
//!
//! ```text
//! Unknown ──► FirstPass ──► Done(value)
//!                 │
//!                 └──► SecondPass ──► Done(on_cycle)
//! ```
//!
//! - `Unknown`: nothing computed yet. The first reader moves the entry to
//!   `FirstPass` and runs `compute`.
//! - `FirstPass`: re-entered by the *same* thread while `compute` is still
//!   running, which means the computation is cyclic. The entry moves to
//!   `SecondPass`, runs `compute` once more (its result is discarded) so every
//!   other member of the cycle goes through the same transition, then stores
//!   `on_cycle(container)`.
//! - `SecondPass`: re-entered during the second pass. Returns
//!   `on_cycle(container)` immediately, which is what bounds the recursion.
//!
//! When the outermost `compute` returns and the entry is still `FirstPass`,
//! its result is stored. If a cycle was detected meanwhile, the cycle value is
//! kept so every member of the cycle agrees on the fallback.
//!
//! ## Concurrency
//!
//! The state lives behind a `Mutex` that is only held for transitions, never
//! across `compute`. In-flight passes record their owning thread. A different
//! thread that finds an in-flight pass computes the value on its own and does
//! not store it: work may be duplicated, state is never corrupted.
//!
//! Such a detached reader runs the same two-pass machine, but on a
//! thread-local table keyed by entry address. Re-entering an entry it is
//! already computing is a cycle on that thread, so detached recursion is
//! bounded exactly like owned recursion.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Unknown,
    FirstPass,
    SecondPass,
    Done,
}

#[derive(Debug)]
enum CacheState<T> {
    Unknown,
    FirstPass(ThreadId),
    SecondPass(ThreadId),
    Done(T),
}

/// Pass of an entry computed by a detached reader on this thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetachedPass {
    First,
    Second,
}

thread_local! {
    static DETACHED: RefCell<BTreeMap<usize, DetachedPass>> =
        const { RefCell::new(BTreeMap::new()) };
}

/// Removes a detached entry from the thread-local table when its outermost
/// pass ends, including on unwind.
struct DetachedGuard(usize);

impl DetachedGuard {
    fn enter(entry: usize) -> Self {
        DETACHED.with_borrow_mut(|passes| passes.insert(entry, DetachedPass::First));
        Self(entry)
    }

    fn cycled(&self) -> bool {
        DETACHED.with_borrow(|passes| passes.get(&self.0) == Some(&DetachedPass::Second))
    }
}

impl Drop for DetachedGuard {
    fn drop(&mut self) {
        DETACHED.with_borrow_mut(|passes| passes.remove(&self.0));
    }
}

/// What a reader has to do after inspecting the state.
enum Step<T> {
    Cached(T),
    Compute,
    BreakCycle,
    Fallback,
    Detached,
}

/// A lazily computed, cycle-tolerant property value.
#[derive(Debug)]
pub struct Cache<T> {
    state: Mutex<CacheState<T>>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cache<T> {
    /// Create an empty cache entry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::Unknown),
        }
    }
}

impl<T: Clone> Cache<T> {
    /// Return the memoized value, computing it on first use.
    ///
    /// `compute` runs at most once per entry unless a cycle forces a second
    /// pass, so it must be safe to call twice. `on_cycle` supplies the value
    /// of every entry found on a cycle.
    pub fn get_value<C: ?Sized>(
        &self,
        container: &C,
        compute: impl Fn(&C) -> T,
        on_cycle: impl Fn(&C) -> T,
    ) -> T {
        let current = thread::current().id();

        let step = {
            let mut state = self.lock();
            match &*state {
                CacheState::Done(value) => Step::Cached(value.clone()),
                CacheState::Unknown => {
                    *state = CacheState::FirstPass(current);
                    Step::Compute
                }
                CacheState::FirstPass(owner) if *owner == current => {
                    *state = CacheState::SecondPass(current);
                    Step::BreakCycle
                }
                CacheState::SecondPass(owner) if *owner == current => Step::Fallback,
                CacheState::FirstPass(_) | CacheState::SecondPass(_) => Step::Detached,
            }
        };

        match step {
            Step::Cached(value) => value,
            Step::Compute => {
                let computed = compute(container);
                let mut state = self.lock();
                match &*state {
                    CacheState::Done(cycle_value) => cycle_value.clone(),
                    _ => {
                        *state = CacheState::Done(computed.clone());
                        computed
                    }
                }
            }
            Step::BreakCycle => {
                tracing::trace!("cycle detected, running second pass");
                let _discarded = compute(container);
                let fallback = on_cycle(container);
                *self.lock() = CacheState::Done(fallback.clone());
                fallback
            }
            Step::Fallback => on_cycle(container),
            Step::Detached => self.detached_value(container, &compute, &on_cycle),
        }
    }

    /// Compute without storing while another thread owns the entry.
    fn detached_value<C: ?Sized>(
        &self,
        container: &C,
        compute: &impl Fn(&C) -> T,
        on_cycle: &impl Fn(&C) -> T,
    ) -> T {
        let entry = ptr::from_ref(self).addr();
        match DETACHED.with_borrow(|passes| passes.get(&entry).copied()) {
            None => {
                let guard = DetachedGuard::enter(entry);
                let computed = compute(container);
                if guard.cycled() {
                    on_cycle(container)
                } else {
                    computed
                }
            }
            Some(DetachedPass::First) => {
                tracing::trace!("cycle detected by a detached reader");
                DETACHED.with_borrow_mut(|passes| passes.insert(entry, DetachedPass::Second));
                let _discarded = compute(container);
                on_cycle(container)
            }
            Some(DetachedPass::Second) => on_cycle(container),
        }
    }

    /// Current state of the entry.
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        match &*self.lock() {
            CacheState::Unknown => CacheStatus::Unknown,
            CacheState::FirstPass(_) => CacheStatus::FirstPass,
            CacheState::SecondPass(_) => CacheStatus::SecondPass,
            CacheState::Done(_) => CacheStatus::Done,
        }
    }

    /// The stored value, if one has been computed.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        match &*self.lock() {
            CacheState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Forget the stored value without recomputing it.
    ///
    /// Only the single writer of a constructible model calls this.
    pub fn flush(&mut self) {
        *self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = CacheState::Unknown;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    /// A tiny dependency graph: node `i` sums `1 + value(next[i])`.
    struct Chain {
        next: Vec<Option<usize>>,
        caches: Vec<Cache<i64>>,
        computations: AtomicUsize,
    }

    impl Chain {
        fn new(next: Vec<Option<usize>>) -> Self {
            let caches = next.iter().map(|_| Cache::new()).collect();
            Self {
                next,
                caches,
                computations: AtomicUsize::new(0),
            }
        }

        fn value(&self, node: usize) -> i64 {
            self.caches[node].get_value(
                self,
                |chain| {
                    chain.computations.fetch_add(1, Ordering::SeqCst);
                    match chain.next[node] {
                        Some(next) => 1 + chain.value(next),
                        None => 0,
                    }
                },
                |_| -1,
            )
        }
    }

    #[test]
    fn acyclic_value_is_computed_once() {
        let chain = Chain::new(vec![Some(1), Some(2), None]);

        assert_eq!(chain.value(0), 2);
        assert_eq!(chain.value(0), 2);
        assert_eq!(chain.value(1), 1);
        assert_eq!(chain.computations.load(Ordering::SeqCst), 3);
        assert_eq!(chain.caches[2].status(), CacheStatus::Done);
    }

    #[test]
    fn two_node_cycle_converges_on_fallback() {
        let chain = Chain::new(vec![Some(1), Some(0)]);

        assert_eq!(chain.value(0), -1);
        assert_eq!(chain.value(1), -1);
        assert_eq!(chain.caches[0].peek(), Some(-1));
        assert_eq!(chain.caches[1].peek(), Some(-1));
    }

    #[test]
    fn self_cycle_converges_on_fallback() {
        let chain = Chain::new(vec![Some(0)]);
        assert_eq!(chain.value(0), -1);
        assert_eq!(chain.caches[0].status(), CacheStatus::Done);
    }

    #[test]
    fn tail_leading_into_cycle_sees_cycle_value() {
        // 0 -> 1 -> 2 -> 1
        let chain = Chain::new(vec![Some(1), Some(2), Some(1)]);

        assert_eq!(chain.value(1), -1);
        assert_eq!(chain.value(2), -1);
        // Node 0 is not on the cycle, it builds on the cycle's fallback.
        assert_eq!(chain.value(0), 0);
    }

    #[test]
    fn flush_forces_recomputation() {
        let mut cache = Cache::new();
        assert_eq!(cache.get_value(&(), |_| 7, |_| 0), 7);
        assert_eq!(cache.status(), CacheStatus::Done);

        cache.flush();
        assert_eq!(cache.status(), CacheStatus::Unknown);
        assert_eq!(cache.peek(), None);
        assert_eq!(cache.get_value(&(), |_| 8, |_| 0), 8);
    }

    #[test]
    fn boolean_results_are_stored_as_values() {
        let cache = Cache::new();
        assert!(!cache.get_value(&(), |_| false, |_| true));
        assert_eq!(cache.peek(), Some(false));
    }

    #[test]
    fn concurrent_readers_agree() {
        let chain = Arc::new(Chain::new(vec![Some(1), Some(2), Some(3), None]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || chain.value(0))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("join"), 3);
        }
        assert_eq!(chain.value(0), 3);
    }

    #[test]
    fn deep_cycle_terminates() {
        const DEPTH: usize = 256;
        let next = (0..DEPTH).map(|i| Some((i + 1) % DEPTH)).collect();
        let chain = Chain::new(next);

        assert_eq!(chain.value(0), -1);
        assert_eq!(chain.value(DEPTH / 2), -1);
        assert!(chain.caches.iter().all(|cache| cache.peek() == Some(-1)));
    }

    /// A self-referential entry whose first computation parks until released.
    struct ParkedLoop {
        cache: Cache<i64>,
        parked: AtomicBool,
        entered: Barrier,
        released: Barrier,
        computations: AtomicUsize,
    }

    impl ParkedLoop {
        fn value(&self) -> i64 {
            self.cache.get_value(
                self,
                |this| {
                    this.computations.fetch_add(1, Ordering::SeqCst);
                    if !this.parked.swap(true, Ordering::SeqCst) {
                        this.entered.wait();
                        this.released.wait();
                    }
                    1 + this.value()
                },
                |_| -1,
            )
        }
    }

    #[test]
    fn detached_reader_terminates_on_owned_cycle() {
        let looped = Arc::new(ParkedLoop {
            cache: Cache::new(),
            parked: AtomicBool::new(false),
            entered: Barrier::new(2),
            released: Barrier::new(2),
            computations: AtomicUsize::new(0),
        });
        let owner = {
            let looped = Arc::clone(&looped);
            thread::spawn(move || looped.value())
        };

        looped.entered.wait();
        assert_eq!(looped.cache.status(), CacheStatus::FirstPass);
        let detached = looped.value();
        let detached_calls = looped.computations.load(Ordering::SeqCst);
        looped.released.wait();

        assert_eq!(detached, -1);
        // One owner pass, then the detached first and second passes.
        assert_eq!(detached_calls, 3);
        assert_eq!(owner.join().expect("join"), -1);
        assert_eq!(looped.cache.peek(), Some(-1));
        assert!(DETACHED.with_borrow(BTreeMap::is_empty));
    }
}
