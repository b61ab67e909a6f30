//! Recursor exchange.
//!
//! Client side of the forwarder: sends a request to one upstream
//! recursor over the same transport the downstream client used and
//! returns the decoded response. A truncated UDP answer is retried over
//! TCP before being handed back, so downstream clients see the complete
//! response whenever the recursor can produce one.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::Message;
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, warn};

use fleet_dns_domain::{DnsError, Protocol};

use super::codec::{decode_message, encode_message, read_framed, write_framed};

/// Responses larger than this cannot arrive over plain UDP.
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

#[async_trait]
pub trait Exchanger: Send + Sync {
    /// Sends `request` to `recursor` and returns the decoded response.
    async fn exchange(
        &self,
        request: &Message,
        protocol: Protocol,
        recursor: SocketAddr,
    ) -> Result<Message, DnsError>;
}

pub struct NetExchanger {
    timeout: Duration,
}

impl NetExchanger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange_udp(&self, bytes: &[u8], recursor: SocketAddr) -> Result<Vec<u8>, DnsError> {
        let bind_addr = if recursor.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::Upstream(format!("Failed to bind UDP socket: {}", e)))?;

        tokio::time::timeout(self.timeout, socket.send_to(bytes, recursor))
            .await
            .map_err(|_| DnsError::QueryTimeout)?
            .map_err(|e| DnsError::Upstream(format!("Failed to send to {}: {}", recursor, e)))?;

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (received, from_addr) =
            tokio::time::timeout(self.timeout, socket.recv_from(&mut recv_buf))
                .await
                .map_err(|_| DnsError::QueryTimeout)?
                .map_err(|e| {
                    DnsError::Upstream(format!("Failed to receive from {}: {}", recursor, e))
                })?;

        if from_addr.ip() != recursor.ip() {
            warn!(
                expected = %recursor,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        recv_buf.truncate(received);
        Ok(recv_buf)
    }

    async fn exchange_tcp(&self, bytes: &[u8], recursor: SocketAddr) -> Result<Vec<u8>, DnsError> {
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(recursor))
            .await
            .map_err(|_| DnsError::QueryTimeout)?
            .map_err(|e| DnsError::Upstream(format!("Failed to connect to {}: {}", recursor, e)))?;

        tokio::time::timeout(self.timeout, write_framed(&mut stream, bytes))
            .await
            .map_err(|_| DnsError::QueryTimeout)?
            .map_err(|e| DnsError::Upstream(format!("Failed to send to {}: {}", recursor, e)))?;

        let response = tokio::time::timeout(self.timeout, read_framed(&mut stream))
            .await
            .map_err(|_| DnsError::QueryTimeout)?
            .map_err(|e| {
                DnsError::Upstream(format!("Failed to receive from {}: {}", recursor, e))
            })?;

        Ok(response)
    }

    fn verify(&self, request: &Message, response: Message, recursor: SocketAddr) -> Result<Message, DnsError> {
        if response.id() != request.id() {
            return Err(DnsError::Upstream(format!(
                "Response id {} from {} does not match request id {}",
                response.id(),
                recursor,
                request.id()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Exchanger for NetExchanger {
    async fn exchange(
        &self,
        request: &Message,
        protocol: Protocol,
        recursor: SocketAddr,
    ) -> Result<Message, DnsError> {
        let bytes = encode_message(request)?;

        match protocol {
            Protocol::Tcp => {
                let response = self.exchange_tcp(&bytes, recursor).await?;
                self.verify(request, decode_message(&response)?, recursor)
            }
            Protocol::Udp => {
                let response = decode_message(&self.exchange_udp(&bytes, recursor).await?)?;
                if !response.truncated() {
                    return self.verify(request, response, recursor);
                }

                debug!(recursor = %recursor, "Truncated UDP response, retrying over TCP");
                let response = self.exchange_tcp(&bytes, recursor).await?;
                self.verify(request, decode_message(&response)?, recursor)
            }
        }
    }
}
