//! Host resolver configuration.
//!
//! On machines where this server should answer first, the loopback
//! address has to become the primary nameserver in `/etc/resolv.conf`.
//! That file is owned by `resolvconf`, so instead of editing it directly
//! the manager prepends a managed block to the resolvconf head file and
//! asks `resolvconf -u` to regenerate, then polls until the change is
//! visible.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use fleet_dns_application::ports::{Clock, CommandRunner};

pub const MANAGED_HEADER: &str = "# This file was automatically updated by fleet-dns";

const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";
const HEAD_FILE_PATH: &str = "/etc/resolvconf/resolv.conf.d/head";

/// Confirmation attempts after rewriting the head file.
const MAX_CONFIRM_ATTEMPTS: u32 = 8;
const CONFIRM_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum ResolvConfError {
    #[error("Failed to read dns nameservers: {0}")]
    Read(String),

    #[error("Failed to write head file {0}: {1}")]
    WriteHead(String, String),

    #[error("Failed to execute resolvconf update: {0}")]
    UpdateCommand(String),

    #[error("Failed to confirm nameserver {0} as primary")]
    ConfirmTimeout(String),
}

pub struct ResolvConfManager {
    resolv_conf_path: PathBuf,
    head_file_path: PathBuf,
    clock: Arc<dyn Clock>,
    command_runner: Arc<dyn CommandRunner>,
}

impl ResolvConfManager {
    pub fn new(clock: Arc<dyn Clock>, command_runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_paths(RESOLV_CONF_PATH, HEAD_FILE_PATH, clock, command_runner)
    }

    pub fn with_paths(
        resolv_conf_path: impl Into<PathBuf>,
        head_file_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        command_runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            resolv_conf_path: resolv_conf_path.into(),
            head_file_path: head_file_path.into(),
            clock,
            command_runner,
        }
    }

    /// Nameserver addresses from resolv.conf, in file order, deduplicated.
    pub async fn read(&self) -> Result<Vec<String>, ResolvConfError> {
        let contents = tokio::fs::read_to_string(&self.resolv_conf_path)
            .await
            .map_err(|e| ResolvConfError::Read(e.to_string()))?;
        Ok(parse_nameservers(&contents))
    }

    /// Makes `address` the first nameserver the host resolver consults.
    ///
    /// Idempotent: when `address` is already primary this returns without
    /// touching the filesystem or running any command. Otherwise the
    /// managed block is prepended to the head file (unless a previous run
    /// already put the address there), `resolvconf -u` regenerates
    /// resolv.conf, and the change is polled until confirmed.
    pub async fn set_primary(&self, address: &str) -> Result<(), ResolvConfError> {
        if self.is_primary(address).await {
            debug!(nameserver = address, "Nameserver already primary");
            return Ok(());
        }

        let existing_head = tokio::fs::read_to_string(&self.head_file_path)
            .await
            .unwrap_or_default();

        if !existing_head.contains(address) {
            let mut head = format!("{}\nnameserver {}\n", MANAGED_HEADER, address);
            if !existing_head.is_empty() {
                head = format!("{}\n{}", head, existing_head);
            }
            tokio::fs::write(&self.head_file_path, head).await.map_err(|e| {
                ResolvConfError::WriteHead(
                    self.head_file_path.display().to_string(),
                    e.to_string(),
                )
            })?;
            info!(nameserver = address, "Wrote resolvconf head file");
        }

        self.command_runner
            .run("resolvconf", &["-u"])
            .await
            .map_err(|e| ResolvConfError::UpdateCommand(e.to_string()))?;

        for attempt in 1..=MAX_CONFIRM_ATTEMPTS {
            self.clock.sleep(CONFIRM_INTERVAL).await;
            if self.is_primary(address).await {
                info!(nameserver = address, "Nameserver confirmed as primary");
                return Ok(());
            }
            debug!(nameserver = address, attempt, "Nameserver not primary yet");
        }

        Err(ResolvConfError::ConfirmTimeout(address.to_string()))
    }

    /// Read failures count as "not primary"; the caller retries or fails
    /// with a clearer error of its own.
    async fn is_primary(&self, address: &str) -> bool {
        match self.read().await {
            Ok(nameservers) => nameservers.first().map(|ns| ns == address).unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn parse_nameservers(contents: &str) -> Vec<String> {
    let mut nameservers: Vec<String> = Vec::new();
    for line in contents.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("nameserver") {
            continue;
        }
        let Some(value) = tokens.next() else {
            continue;
        };
        if !nameservers.iter().any(|ns| ns == value) {
            nameservers.push(value.to_string());
        }
    }
    nameservers
}
