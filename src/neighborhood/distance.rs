//! Distance metrics between sparse weight vectors
//!
//! Vectors are given as `(index, value)` pairs sorted by index. Indices
//! missing from one side count as zero, so the distance only ranges over the
//! indices either vector holds.

use std::cmp::Ordering;
use std::iter::Peekable;

/// Trait for distance metrics between sparse vectors
pub trait DistanceMetric: Clone + Send + Sync {
    /// Calculate distance between two index-sorted sparse vectors
    fn distance<A, B>(&self, a: A, b: B) -> f64
    where
        A: IntoIterator<Item = (usize, f64)>,
        B: IntoIterator<Item = (usize, f64)>;
}

/// Euclidean distance metric
#[derive(Clone, Debug, Default)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn distance<A, B>(&self, a: A, b: B) -> f64
    where
        A: IntoIterator<Item = (usize, f64)>,
        B: IntoIterator<Item = (usize, f64)>,
    {
        MergeJoin::new(a, b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Manhattan (L1) distance metric
#[derive(Clone, Debug, Default)]
pub struct Manhattan;

impl DistanceMetric for Manhattan {
    fn distance<A, B>(&self, a: A, b: B) -> f64
    where
        A: IntoIterator<Item = (usize, f64)>,
        B: IntoIterator<Item = (usize, f64)>,
    {
        MergeJoin::new(a, b).map(|(x, y)| (x - y).abs()).sum()
    }
}

/// Walks two index-sorted sparse vectors in lockstep, yielding value pairs
/// with zero filled in for the missing side.
struct MergeJoin<A: Iterator, B: Iterator> {
    a: Peekable<A>,
    b: Peekable<B>,
}

impl<A, B> MergeJoin<A, B>
where
    A: Iterator<Item = (usize, f64)>,
    B: Iterator<Item = (usize, f64)>,
{
    fn new<IA, IB>(a: IA, b: IB) -> Self
    where
        IA: IntoIterator<IntoIter = A>,
        IB: IntoIterator<IntoIter = B>,
    {
        Self {
            a: a.into_iter().peekable(),
            b: b.into_iter().peekable(),
        }
    }
}

impl<A, B> Iterator for MergeJoin<A, B>
where
    A: Iterator<Item = (usize, f64)>,
    B: Iterator<Item = (usize, f64)>,
{
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.a.peek(), self.b.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((ia, _)), Some((ib, _))) => ia.cmp(ib),
        };
        match order {
            Ordering::Less => self.a.next().map(|(_, x)| (x, 0.0)),
            Ordering::Greater => self.b.next().map(|(_, y)| (0.0, y)),
            Ordering::Equal => {
                let (_, x) = self.a.next()?;
                let (_, y) = self.b.next()?;
                Some((x, y))
            }
        }
    }
}
