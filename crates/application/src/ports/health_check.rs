use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct HealthCheckError(pub String);

/// One liveness probe, polled per protocol by the server run loop.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn is_healthy(&self) -> Result<(), HealthCheckError>;
}
