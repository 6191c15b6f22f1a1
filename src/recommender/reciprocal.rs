use std::sync::Arc;

use super::InteractiveRecommender;
use crate::simulation::{Dataset, Warmup};

/// Contact-recommendation decorator.
///
/// When `u` is recommended person `i` and the ground truth says `i` already
/// rated `u`, the reverse pair `(i, u)` is consumed and learned too, so `u`
/// is never later proposed to someone who already chose them.
pub struct NotReciprocal<R> {
    inner: R,
    dataset: Arc<Dataset>,
}

impl<R: InteractiveRecommender> NotReciprocal<R> {
    pub fn new(inner: R, dataset: Arc<Dataset>) -> Self {
        Self { inner, dataset }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn reverse_pair(&self, uidx: usize, iidx: usize) -> Option<(usize, usize)> {
        let vidx = self.dataset.item_as_user(iidx)?;
        let jidx = self.dataset.user_as_item(uidx)?;
        self.dataset.preference(vidx, jidx)?;
        self.inner
            .available(vidx)
            .contains(&jidx)
            .then_some((vidx, jidx))
    }
}

impl<R: InteractiveRecommender> InteractiveRecommender for NotReciprocal<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&mut self, warmup: &Warmup) {
        self.inner.init(warmup);
    }

    fn next(&mut self, uidx: usize) -> Option<usize> {
        self.inner.next(uidx)
    }

    fn next_list(&mut self, uidx: usize, k: usize) -> Vec<usize> {
        self.inner.next_list(uidx, k)
    }

    fn update(&mut self, uidx: usize, iidx: usize, value: Option<f64>) {
        self.inner.update(uidx, iidx, value);
        if let Some((vidx, jidx)) = self.reverse_pair(uidx, iidx) {
            let reward = self.dataset.reward(vidx, jidx);
            self.inner.update(vidx, jidx, reward);
        }
    }

    fn available(&self, uidx: usize) -> &[usize] {
        self.inner.available(uidx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::{Interactive, RandomRecommender};

    #[test]
    fn test_reverse_pair_is_consumed() {
        let raw = [("ann", "bob", 1.0), ("bob", "ann", 1.0), ("bob", "cid", 1.0)];
        let dataset = Arc::new(
            Dataset::from_triples(
                raw.iter().map(|&(u, i, v)| (u.to_string(), i.to_string(), v)),
                1.0,
            )
            .contact(true),
        );
        // users: ann=0 bob=1, items: bob=0 ann=1 cid=2
        let inner = Interactive::new("random", RandomRecommender::random(3, 1), true);
        let mut rec = NotReciprocal::new(inner, Arc::clone(&dataset));
        rec.init(&Warmup::empty(&dataset));
        assert_eq!(rec.available(1), &[1, 2]);

        // ann gets bob; bob already rated ann, so bob -> ann is gone too
        rec.update(0, 0, dataset.reward(0, 0));
        assert_eq!(rec.available(0), &[2]);
        assert_eq!(rec.available(1), &[2]);

        // bob gets cid: cid is no user, nothing else changes
        rec.update(1, 2, dataset.reward(1, 2));
        assert_eq!(rec.available(0), &[2]);
        assert!(rec.available(1).is_empty());
    }
}
