use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use fleet_dns_application::ports::{Connection, Dialer};
use fleet_dns_domain::Protocol;

/// Dialer over real tokio sockets. The server uses it to probe its own
/// listeners, so connections are short lived and never carry payload.
#[derive(Debug, Default, Clone)]
pub struct NetDialer;

impl NetDialer {
    pub fn new() -> Self {
        Self
    }
}

struct TcpConnection(TcpStream);

#[async_trait]
impl Connection for TcpConnection {
    async fn close(self: Box<Self>) -> io::Result<()> {
        let mut stream = self.0;
        stream.shutdown().await
    }
}

struct UdpConnection {
    _socket: UdpSocket,
}

#[async_trait]
impl Connection for UdpConnection {
    async fn close(self: Box<Self>) -> io::Result<()> {
        // UDP has no teardown handshake; dropping the socket releases it.
        Ok(())
    }
}

#[async_trait]
impl Dialer for NetDialer {
    async fn dial(&self, protocol: Protocol, addr: SocketAddr) -> io::Result<Box<dyn Connection>> {
        match protocol {
            Protocol::Tcp => {
                let stream = TcpStream::connect(addr).await?;
                Ok(Box::new(TcpConnection(stream)))
            }
            Protocol::Udp => {
                let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(bind_addr).await?;
                socket.connect(addr).await?;
                Ok(Box::new(UdpConnection { _socket: socket }))
            }
        }
    }
}
