use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use fleet_dns_domain::Protocol;

/// An established client connection. The self-dial health check only
/// needs to open and cleanly close one.
#[async_trait]
pub trait Connection: Send {
    async fn close(self: Box<Self>) -> io::Result<()>;
}

/// Port for opening client connections, swappable for tests so no real
/// sockets are needed.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, protocol: Protocol, addr: SocketAddr)
        -> io::Result<Box<dyn Connection>>;
}
