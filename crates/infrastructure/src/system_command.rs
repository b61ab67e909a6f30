use async_trait::async_trait;
use tokio::process::Command;

use fleet_dns_application::ports::{CommandError, CommandRunner};

/// Runs external programs through `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct ExecCommandRunner;

impl ExecCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ExecCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<(), CommandError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| CommandError(format!("{program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CommandError(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
