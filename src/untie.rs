//! Arg-max and top-k selection with random tie-breaking.
//!
//! Every selection in the harness goes through these helpers so that ties are
//! broken by the caller's seeded RNG and never by iteration order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore};

/// Returns the index with the highest score, choosing uniformly among ties.
///
/// NaN scores are treated as negative infinity. Returns `None` only for an
/// empty input.
pub fn argmax<I>(scored: I, rng: &mut dyn RngCore) -> Option<usize>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    let mut best: Option<(usize, f64)> = None;
    let mut ties = 0u32;

    for (idx, score) in scored {
        let score = if score.is_nan() {
            f64::NEG_INFINITY
        } else {
            score
        };
        match best {
            None => {
                best = Some((idx, score));
                ties = 1;
            }
            Some((_, top)) if score > top => {
                best = Some((idx, score));
                ties = 1;
            }
            Some((_, top)) if score == top => {
                ties += 1;
                // Reservoir sampling over the tied candidates.
                if rng.random_range(0..ties) == 0 {
                    best = Some((idx, score));
                }
            }
            _ => {}
        }
    }

    best.map(|(idx, _)| idx)
}

/// Returns up to `k` indices with the highest scores, best first.
///
/// Uses a bounded min-heap of size `k`; ties are ordered by a random key
/// drawn per candidate.
pub fn top_k<I>(scored: I, k: usize, rng: &mut dyn RngCore) -> Vec<usize>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, usize)>> =
        BinaryHeap::with_capacity(k + 1);

    for (idx, score) in scored {
        let score = if score.is_nan() {
            f64::NEG_INFINITY
        } else {
            score
        };
        let entry = Reverse((OrderedFloat(score), rng.next_u64(), idx));
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(mut smallest) = heap.peek_mut() {
            if entry < *smallest {
                *smallest = entry;
            }
        }
    }

    // into_sorted_vec is ascending in Reverse order, i.e. best first
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse((_, _, idx))| idx)
        .collect()
}
