use rand::seq::{IndexedRandom, SliceRandom};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Picks the user served by the next iteration.
pub trait UserSelector: Send {
    /// Starts over with `users`, in index order.
    fn init(&mut self, users: Vec<usize>);

    /// Next user, `None` once every user was removed.
    fn select(&mut self, rng: &mut dyn RngCore) -> Option<usize>;

    /// Retires a user for the rest of the run.
    fn remove(&mut self, uidx: usize);

    fn num_users(&self) -> usize;
}

/// Uniformly random user each iteration.
#[derive(Clone, Debug, Default)]
pub struct RandomSelector {
    users: Vec<usize>,
}

impl UserSelector for RandomSelector {
    fn init(&mut self, users: Vec<usize>) {
        self.users = users;
    }

    fn select(&mut self, rng: &mut dyn RngCore) -> Option<usize> {
        self.users.choose(rng).copied()
    }

    fn remove(&mut self, uidx: usize) {
        if let Some(pos) = self.users.iter().position(|&u| u == uidx) {
            self.users.remove(pos);
        }
    }

    fn num_users(&self) -> usize {
        self.users.len()
    }
}

/// Users in a fixed cyclic order.
///
/// Removing a user keeps the cursor on the user that would have come next,
/// so nobody is skipped when the list shrinks.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinSelector {
    users: Vec<usize>,
    cursor: usize,
    reshuffle: bool,
}

impl RoundRobinSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Round robin over a fresh random permutation every round.
    #[must_use]
    pub fn shuffled() -> Self {
        Self {
            reshuffle: true,
            ..Self::default()
        }
    }
}

impl UserSelector for RoundRobinSelector {
    fn init(&mut self, users: Vec<usize>) {
        self.users = users;
        // a shuffled selector permutes before its first round
        self.cursor = if self.reshuffle { self.users.len() } else { 0 };
    }

    fn select(&mut self, rng: &mut dyn RngCore) -> Option<usize> {
        if self.users.is_empty() {
            return None;
        }
        if self.cursor >= self.users.len() {
            self.cursor = 0;
            if self.reshuffle {
                self.users.shuffle(rng);
            }
        }
        let uidx = self.users[self.cursor];
        self.cursor += 1;
        Some(uidx)
    }

    fn remove(&mut self, uidx: usize) {
        if let Some(pos) = self.users.iter().position(|&u| u == uidx) {
            self.users.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
        }
    }

    fn num_users(&self) -> usize {
        self.users.len()
    }
}

/// Serialisable choice of selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    Random,
    RoundRobin,
    RandomRoundRobin,
}

impl SelectorKind {
    pub fn build(self) -> Box<dyn UserSelector> {
        match self {
            SelectorKind::Random => Box::new(RandomSelector::default()),
            SelectorKind::RoundRobin => Box::new(RoundRobinSelector::new()),
            SelectorKind::RandomRoundRobin => Box::new(RoundRobinSelector::shuffled()),
        }
    }
}
