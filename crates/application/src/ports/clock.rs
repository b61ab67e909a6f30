use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Time source for anything that measures or waits. Swappable so tests
/// never sleep for real.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}
