use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use fleet_dns_application::ports::{Dialer, HealthCheck};
use fleet_dns_domain::{Config, Protocol};
use fleet_dns_infrastructure::dns::{
    DnsHandler, DnsListener, DnsServer, ListenerHealthCheck, TcpServerListener, UdpServerListener,
};
use fleet_dns_infrastructure::NetDialer;

/// Assembles both listeners and their self-dial health checks around
/// the handler chain.
pub fn build_server(
    config: &Config,
    handler: Arc<dyn DnsHandler>,
    shutdown: CancellationToken,
) -> anyhow::Result<DnsServer> {
    let bind = config.bind_address();
    let target: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address '{bind}'"))?;

    let listeners = vec![
        Arc::new(UdpServerListener::new(bind.clone(), handler.clone())) as Arc<dyn DnsListener>,
        Arc::new(TcpServerListener::new(bind, handler)) as Arc<dyn DnsListener>,
    ];

    let dialer: Arc<dyn Dialer> = Arc::new(NetDialer::new());
    let checks = vec![
        (
            Protocol::Udp,
            Arc::new(ListenerHealthCheck::new(Protocol::Udp, target, dialer.clone()))
                as Arc<dyn HealthCheck>,
        ),
        (
            Protocol::Tcp,
            Arc::new(ListenerHealthCheck::new(Protocol::Tcp, target, dialer))
                as Arc<dyn HealthCheck>,
        ),
    ];

    Ok(DnsServer::new(
        listeners,
        checks,
        config.bind_timeout(),
        shutdown,
    ))
}
