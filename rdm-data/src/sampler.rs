//! Sampling scheduler: every camera of a split is visited once per sweep

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rdm_core::{RdmError, Result, Split};

/// Indices of a split not yet sampled in the current sweep
///
/// Always a duplicate-free subset of `[0, len)`; refilled with the full
/// ascending range as soon as it runs empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenCameras {
    indices: Vec<usize>,
    len: usize,
}

impl UnseenCameras {
    pub fn new(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
            len,
        }
    }

    /// Start a new sweep over `[0, len)`
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.indices = (0..len).collect();
    }

    pub fn remaining(&self) -> &[usize] {
        &self.indices
    }

    /// Size of the index range swept
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take the last unseen index
    pub fn pop_last(&mut self) -> Option<usize> {
        let index = self.indices.pop()?;
        self.refill_if_exhausted();
        Some(index)
    }

    /// Take a uniformly random unseen index
    pub fn pop_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.indices.is_empty() {
            return None;
        }
        let position = rng.random_range(0..self.indices.len());
        let index = self.indices.remove(position);
        self.refill_if_exhausted();
        Some(index)
    }

    fn refill_if_exhausted(&mut self) {
        if self.indices.is_empty() {
            self.indices = (0..self.len).collect();
        }
    }
}

/// Train and eval worklists: train is drained in fixed stack order, eval at random
#[derive(Debug, Clone)]
pub struct Scheduler {
    train: UnseenCameras,
    eval: UnseenCameras,
    rng: StdRng,
}

impl Scheduler {
    /// `seed` fixes the eval order; `None` seeds from the operating system
    pub fn new(train_len: usize, eval_len: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            train: UnseenCameras::new(train_len),
            eval: UnseenCameras::new(eval_len),
            rng,
        }
    }

    pub fn next_train_index(&mut self) -> Result<usize> {
        self.train.pop_last().ok_or(RdmError::EmptySplit(Split::Train))
    }

    /// `split` names the eval split in the error when it is empty
    pub fn next_eval_index(&mut self, split: Split) -> Result<usize> {
        self.eval
            .pop_random(&mut self.rng)
            .ok_or(RdmError::EmptySplit(split))
    }

    /// Restart the train sweep over `[0, len)`
    pub fn reset_train(&mut self, len: usize) {
        self.train.reset(len);
    }

    pub fn train(&self) -> &UnseenCameras {
        &self.train
    }

    pub fn eval(&self) -> &UnseenCameras {
        &self.eval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn train_sweep_is_a_permutation() {
        for n in 1..12 {
            let mut scheduler = Scheduler::new(n, 0, Some(0));
            let drawn: Vec<usize> = (0..n).map(|_| scheduler.next_train_index().unwrap()).collect();

            let mut sorted = drawn.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..n).collect::<Vec<_>>());

            // Refilled after the sweep, and the next draw is valid again
            assert_eq!(scheduler.train().remaining().len(), n);
            assert!(scheduler.next_train_index().unwrap() < n);
        }
    }

    #[test]
    fn train_order_is_fixed_stack_order() {
        let mut scheduler = Scheduler::new(4, 0, None);
        let first: Vec<usize> = (0..4).map(|_| scheduler.next_train_index().unwrap()).collect();
        let second: Vec<usize> = (0..4).map(|_| scheduler.next_train_index().unwrap()).collect();
        assert_eq!(first, vec![3, 2, 1, 0]);
        assert_eq!(first, second);
    }

    #[test]
    fn eval_sweeps_cover_the_range() {
        let n = 9;
        let mut scheduler = Scheduler::new(0, n, Some(42));
        for _ in 0..3 {
            let sweep: BTreeSet<usize> = (0..n)
                .map(|_| scheduler.next_eval_index(Split::Val).unwrap())
                .collect();
            assert_eq!(sweep, (0..n).collect::<BTreeSet<_>>());
        }
    }

    #[test]
    fn eval_order_depends_on_seed() {
        let n = 20;
        let draw = |seed| {
            let mut scheduler = Scheduler::new(0, n, Some(seed));
            (0..n)
                .map(|_| scheduler.next_eval_index(Split::Val).unwrap())
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(1), draw(1));
        assert_ne!(draw(1), draw(2));
    }

    #[test]
    fn empty_split_is_a_precondition_error() {
        let mut scheduler = Scheduler::new(0, 0, Some(0));
        assert!(matches!(
            scheduler.next_train_index(),
            Err(RdmError::EmptySplit(Split::Train))
        ));
        assert!(matches!(
            scheduler.next_eval_index(Split::Test),
            Err(RdmError::EmptySplit(Split::Test))
        ));
    }

    #[test]
    fn reset_puts_new_index_first() {
        let mut scheduler = Scheduler::new(3, 0, Some(0));
        scheduler.next_train_index().unwrap();
        scheduler.reset_train(4);
        assert_eq!(scheduler.next_train_index().unwrap(), 3);
    }

    #[test]
    fn worklist_never_holds_duplicates() {
        let mut unseen = UnseenCameras::new(5);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..17 {
            unseen.pop_random(&mut rng).unwrap();
            let set: BTreeSet<_> = unseen.remaining().iter().copied().collect();
            assert_eq!(set.len(), unseen.remaining().len());
            assert!(set.iter().all(|&i| i < unseen.len()));
        }
    }
}
