use std::cmp::Ordering;
use std::collections::VecDeque;

// Ordering holder idiom adapted from:
// https://github.com/evenfurther/pathfinding/blob/main/src/directed/astar.rs
// Released under a dual Apache 2.0 / MIT free software license.

/// Element of a `BinaryHeap` used as a min-heap keyed on `estimated_cost`.
/// Ties prefer the larger `cost`, which drives the search deeper first.
/// `index` links back into the caller's node storage.
pub(crate) struct CostHolder<K> {
    pub estimated_cost: K,
    pub cost: K,
    pub index: u32,
}

impl<K: PartialEq> PartialEq for CostHolder<K> {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost.eq(&other.estimated_cost) && self.cost.eq(&other.cost)
    }
}

impl<K: PartialEq> Eq for CostHolder<K> {}

impl<K: Ord> PartialOrd for CostHolder<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for CostHolder<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.estimated_cost.cmp(&self.estimated_cost) {
            Ordering::Equal => self.cost.cmp(&other.cost),
            s => s,
        }
    }
}

/// FIFO queue of node indices with amortized O(1) enqueue/dequeue, holding
/// partial paths in breadth-first order for the enumeration strategy.
#[derive(Default)]
pub(crate) struct Fifo {
    inner: VecDeque<u32>,
}

impl Fifo {
    #[inline]
    pub fn push(&mut self, index: u32) {
        self.inner.push_back(index);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u32> {
        self.inner.pop_front()
    }
}
