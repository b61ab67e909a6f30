mod repository;

pub use repository::{FileRecordSource, StaticRecordSource};
