//! Answer order randomization.
//!
//! Most DNS clients take the first answer, so serving records in a fixed
//! order would pin all traffic to one instance. Shuffling equal-priority
//! answers spreads the load.

use hickory_proto::rr::Record;

pub trait AnswerShuffler: Send + Sync {
    /// Returns a permutation of `records`: same multiset, never adds,
    /// drops, or duplicates.
    fn shuffle(&self, records: Vec<Record>) -> Vec<Record>;
}

/// Fisher-Yates over the whole answer set.
#[derive(Debug, Default, Clone)]
pub struct RandomAnswerShuffler;

impl RandomAnswerShuffler {
    pub fn new() -> Self {
        Self
    }
}

impl AnswerShuffler for RandomAnswerShuffler {
    fn shuffle(&self, mut records: Vec<Record>) -> Vec<Record> {
        for i in (1..records.len()).rev() {
            let j = fastrand::usize(..=i);
            records.swap(i, j);
        }
        records
    }
}
