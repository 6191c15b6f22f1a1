/// Per-user lists of items that can still be recommended.
///
/// Items leave a list at most once, when the pair is dispatched, and never
/// come back within a run.
#[derive(Clone, Debug, Default)]
pub struct Availability {
    lists: Vec<Vec<usize>>,
}

impl Availability {
    pub fn new(lists: Vec<Vec<usize>>) -> Self {
        Self { lists }
    }

    pub fn num_users(&self) -> usize {
        self.lists.len()
    }

    /// Items still available to `uidx`, empty for unknown users.
    pub fn items(&self, uidx: usize) -> &[usize] {
        self.lists.get(uidx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_exhausted(&self, uidx: usize) -> bool {
        self.items(uidx).is_empty()
    }

    /// Removes `iidx` from the list of `uidx`, keeping the order of the rest.
    ///
    /// Returns whether the item was there.
    pub fn remove(&mut self, uidx: usize, iidx: usize) -> bool {
        let Some(list) = self.lists.get_mut(uidx) else {
            return false;
        };
        match list.iter().position(|&candidate| candidate == iidx) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Users with at least one item left.
    pub fn active_users(&self) -> impl Iterator<Item = usize> + '_ {
        self.lists
            .iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .map(|(uidx, _)| uidx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_once() {
        let mut availability = Availability::new(vec![vec![2, 0, 1], vec![]]);
        assert!(availability.remove(0, 0));
        assert!(!availability.remove(0, 0));
        assert_eq!(availability.items(0), &[2, 1]);
        assert!(availability.is_exhausted(1));
        assert!(availability.is_exhausted(7));
        assert!(!availability.remove(7, 0));
        assert_eq!(availability.active_users().collect::<Vec<_>>(), vec![0]);
    }
}
