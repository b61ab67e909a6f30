use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct CommandError(pub String);

/// Port for running system commands, used by the resolver-config
/// manager to trigger the host's resolver update mechanism.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<(), CommandError>;
}
