mod answer_shuffler;

pub use answer_shuffler::{AnswerShuffler, RandomAnswerShuffler};
