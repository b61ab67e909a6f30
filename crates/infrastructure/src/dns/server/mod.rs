//! Server lifecycle.
//!
//! [`DnsServer::run`] owns the whole life of the serving stack: spawn
//! the listeners, hold the caller until self-dial probes confirm every
//! transport answers, then watch health until shutdown is requested,
//! a listener dies, or the probes fail often enough that a restart by
//! the supervisor is the better option.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, select_all};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fleet_dns_application::ports::HealthCheck;
use fleet_dns_domain::Protocol;

mod health;
mod listeners;

pub use health::ListenerHealthCheck;
pub use listeners::{DnsListener, TcpServerListener, UdpServerListener};

/// Consecutive failed self-dials on one transport before the server
/// terminates its run.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Pause between self-dials once the server is up.
pub const DEFAULT_HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pause between bind probes during startup.
const BIND_CHECK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("timed out waiting for server to bind")]
    BindTimeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct DnsServer {
    listeners: Vec<Arc<dyn DnsListener>>,
    checks: Vec<(Protocol, Arc<dyn HealthCheck>)>,
    bind_timeout: Duration,
    shutdown: CancellationToken,
    failure_threshold: u32,
    health_poll_interval: Duration,
}

impl DnsServer {
    pub fn new(
        listeners: Vec<Arc<dyn DnsListener>>,
        checks: Vec<(Protocol, Arc<dyn HealthCheck>)>,
        bind_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            listeners,
            checks,
            bind_timeout,
            shutdown,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            health_poll_interval: DEFAULT_HEALTH_POLL_INTERVAL,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_health_poll_interval(mut self, interval: Duration) -> Self {
        self.health_poll_interval = interval;
        self
    }

    /// Serves until shutdown is requested, a listener fails, or health
    /// probes exhaust the failure threshold.
    ///
    /// Listener errors and bind timeouts are returned as-is. Sustained
    /// health failure ends the run without an error; from the outside it
    /// looks like a shutdown, and the supervisor decides what restarting
    /// means.
    pub async fn run(&self) -> Result<(), ServerError> {
        let (err_tx, mut err_rx) = mpsc::channel::<ServerError>(self.listeners.len().max(1));

        let mut serve_tasks: JoinSet<()> = JoinSet::new();
        for listener in &self.listeners {
            let listener = listener.clone();
            let err_tx = err_tx.clone();
            serve_tasks.spawn(async move {
                if let Err(e) = listener.listen_and_serve().await {
                    let _ = err_tx.send(e).await;
                }
            });
        }
        drop(err_tx);

        let bound = tokio::select! {
            Some(err) = err_rx.recv() => Err(err),
            outcome = self.wait_until_bound() => outcome,
        };
        if let Err(e) = bound {
            error!(error = %e, "Server failed to start");
            return Err(e);
        }
        info!("Server confirmed bound on all transports");

        let degraded = self.monitor_health();
        tokio::pin!(degraded);

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                self.shutdown_listeners().await
            }
            Some(err) = err_rx.recv() => {
                error!(error = %err, "Listener failed");
                Err(err)
            }
            _ = &mut degraded => {
                warn!("Ending run after sustained health check failure");
                Ok(())
            }
        }
    }

    /// Resolves once every transport has answered a probe, or fails
    /// after the bind timeout.
    async fn wait_until_bound(&self) -> Result<(), ServerError> {
        let probes = self.checks.iter().map(|(protocol, check)| {
            let protocol = *protocol;
            let check = check.clone();
            async move {
                loop {
                    match check.is_healthy().await {
                        Ok(()) => {
                            debug!(protocol = %protocol, "Listener answered bind probe");
                            return;
                        }
                        Err(e) => {
                            debug!(protocol = %protocol, error = %e, "Waiting for listener to bind")
                        }
                    }
                    tokio::time::sleep(BIND_CHECK_INTERVAL).await;
                }
            }
        });

        match tokio::time::timeout(self.bind_timeout, join_all(probes)).await {
            Ok(_) => Ok(()),
            Err(_) => Err(ServerError::BindTimeout),
        }
    }

    /// Resolves when any transport accumulates `failure_threshold`
    /// consecutive probe failures. Counters are per transport and reset
    /// on the first success.
    async fn monitor_health(&self) {
        if self.checks.is_empty() {
            return std::future::pending::<()>().await;
        }

        let monitors = self.checks.iter().map(|(protocol, check)| {
            let protocol = *protocol;
            let check = check.clone();
            let threshold = self.failure_threshold;
            let interval = self.health_poll_interval;
            Box::pin(async move {
                let mut consecutive_failures = 0u32;
                loop {
                    tokio::time::sleep(interval).await;
                    match check.is_healthy().await {
                        Ok(()) => {
                            if consecutive_failures > 0 {
                                info!(protocol = %protocol, "Health restored");
                            }
                            consecutive_failures = 0;
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            warn!(
                                protocol = %protocol,
                                consecutive_failures,
                                error = %e,
                                "Self health check failed"
                            );
                            if consecutive_failures >= threshold {
                                error!(
                                    protocol = %protocol,
                                    threshold,
                                    "Health check failure threshold reached, terminating"
                                );
                                return;
                            }
                        }
                    }
                }
            })
        });

        select_all(monitors).await;
    }

    /// Asks every listener to stop. All of them are shut down even when
    /// one fails; the first error is the one reported.
    async fn shutdown_listeners(&self) -> Result<(), ServerError> {
        info!("Shutting down DNS server");
        let mut result = Ok(());
        for listener in &self.listeners {
            if let Err(e) = listener.shutdown().await {
                error!(error = %e, "Listener shutdown failed");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
