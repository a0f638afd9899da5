//! Bounded top-K selection.
//!
//! A min-heap of at most `k` scored candidates is kept while scanning. A new
//! candidate enters when the heap is not full, or when its score is strictly
//! greater than the current minimum (which is then evicted). Each item is
//! scored exactly once.
//!
//! Order among equal scores is implementation-defined.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered so that the lowest score sits at the top of the heap
struct Scored<T> {
    score: f32,
    item: T,
}

impl<T> PartialEq for Scored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl<T> Eq for Scored<T> {}

impl<T> Ord for Scored<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smaller score = higher priority
        other.score.partial_cmp(&self.score).unwrap_or(Ordering::Equal)
    }
}

impl<T> PartialOrd for Scored<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the `k` highest-scoring items, sorted by descending score.
pub fn top_k<T, I, F>(items: I, k: usize, mut score: F) -> Vec<(T, f32)>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> f32,
{
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Scored<T>> = BinaryHeap::with_capacity(k);
    for item in items {
        let s = score(&item);
        if heap.len() < k {
            heap.push(Scored { score: s, item });
        } else if let Some(min) = heap.peek() {
            if s > min.score {
                heap.pop();
                heap.push(Scored { score: s, item });
            }
        }
    }

    let mut results: Vec<(T, f32)> = heap.into_iter().map(|c| (c.item, c.score)).collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    results
}
