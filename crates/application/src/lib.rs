//! Fleet DNS Application Layer
pub mod ports;
pub mod services;
pub mod use_cases;

pub use services::{AnswerShuffler, RandomAnswerShuffler};
pub use use_cases::LocalDomainResolver;
