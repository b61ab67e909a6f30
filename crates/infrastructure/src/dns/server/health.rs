use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use fleet_dns_application::ports::{Dialer, HealthCheck, HealthCheckError};
use fleet_dns_domain::Protocol;

/// Probes one of the server's own listeners by dialing it. Connecting
/// and closing cleanly counts as healthy; no DNS payload is exchanged.
pub struct ListenerHealthCheck {
    protocol: Protocol,
    target: SocketAddr,
    dialer: Arc<dyn Dialer>,
}

impl ListenerHealthCheck {
    pub fn new(protocol: Protocol, target: SocketAddr, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            protocol,
            target,
            dialer,
        }
    }
}

#[async_trait]
impl HealthCheck for ListenerHealthCheck {
    async fn is_healthy(&self) -> Result<(), HealthCheckError> {
        let connection = self
            .dialer
            .dial(self.protocol, self.target)
            .await
            .map_err(|e| {
                HealthCheckError(format!("{} dial {}: {}", self.protocol, self.target, e))
            })?;

        connection.close().await.map_err(|e| {
            HealthCheckError(format!("{} close {}: {}", self.protocol, self.target, e))
        })
    }
}
