//! Protocol listeners.
//!
//! One listener per transport, each owning its socket and accept loop.
//! Both decode requests off the wire and hand them to the shared handler
//! chain; neither interprets DNS beyond framing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dns::codec::{decode_message, read_framed};
use crate::dns::handler::DnsHandler;
use crate::dns::writer::{TcpResponseWriter, UdpResponseWriter};

use super::ServerError;

/// Largest request accepted off the UDP socket. Covers EDNS-advertised
/// payloads without trusting the peer with unbounded buffers.
const UDP_BUFFER_SIZE: usize = 4096;

#[async_trait]
pub trait DnsListener: Send + Sync {
    /// Binds and serves until shutdown. An error means the listener
    /// never came up or died; the server treats either as fatal.
    async fn listen_and_serve(&self) -> Result<(), ServerError>;

    /// Asks the serve loop to stop and waits until it has.
    async fn shutdown(&self) -> Result<(), ServerError>;
}

pub struct UdpServerListener {
    bind_address: String,
    handler: Arc<dyn DnsHandler>,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl UdpServerListener {
    pub fn new(bind_address: String, handler: Arc<dyn DnsHandler>) -> Self {
        Self {
            bind_address,
            handler,
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl DnsListener for UdpServerListener {
    async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let _done = self.done.clone().drop_guard();

        let socket = Arc::new(UdpSocket::bind(&self.bind_address).await?);
        info!(address = %self.bind_address, "UDP listener bound");

        let mut workers: JoinSet<()> = JoinSet::new();
        let mut buf = vec![0u8; UDP_BUFFER_SIZE];
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            let request_bytes = buf[..len].to_vec();
                            let handler = self.handler.clone();
                            let socket = socket.clone();
                            workers.spawn(async move {
                                serve_udp_request(socket, peer, request_bytes, handler).await;
                            });
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            error!(error = %e, "UDP receive failed");
                            return Err(e.into());
                        }
                    }
                }
            }
        }

        // Let requests already in flight write their responses.
        while workers.join_next().await.is_some() {}
        info!(address = %self.bind_address, "UDP listener stopped");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ServerError> {
        self.cancel.cancel();
        self.done.cancelled().await;
        Ok(())
    }
}

async fn serve_udp_request(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    bytes: Vec<u8>,
    handler: Arc<dyn DnsHandler>,
) {
    let request = match decode_message(&bytes) {
        Ok(request) => request,
        Err(e) => {
            debug!(peer = %peer, error = %e, "Dropping undecodable UDP packet");
            return;
        }
    };

    let mut writer = UdpResponseWriter::new(socket, peer);
    handler.serve_dns(&mut writer, &request).await;
}

pub struct TcpServerListener {
    bind_address: String,
    handler: Arc<dyn DnsHandler>,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl TcpServerListener {
    pub fn new(bind_address: String, handler: Arc<dyn DnsHandler>) -> Self {
        Self {
            bind_address,
            handler,
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl DnsListener for TcpServerListener {
    async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let _done = self.done.clone().drop_guard();

        let listener = TcpListener::bind(&self.bind_address).await?;
        info!(address = %self.bind_address, "TCP listener bound");

        let mut connections: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let handler = self.handler.clone();
                            let cancel = self.cancel.clone();
                            connections.spawn(async move {
                                serve_tcp_connection(stream, peer, handler, cancel).await;
                            });
                        }
                        Err(e) if is_transient_accept_error(&e) => continue,
                        Err(e) => {
                            error!(error = %e, "TCP accept failed");
                            return Err(e.into());
                        }
                    }
                }
            }
        }

        // Connection tasks watch the same token, so draining is bounded
        // by one in-flight request each.
        while connections.join_next().await.is_some() {}
        info!(address = %self.bind_address, "TCP listener stopped");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ServerError> {
        self.cancel.cancel();
        self.done.cancelled().await;
        Ok(())
    }
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}

async fn serve_tcp_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn DnsHandler>,
    cancel: CancellationToken,
) {
    let (mut read_half, write_half) = stream.into_split();
    let write_half = Arc::new(Mutex::new(write_half));

    loop {
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return,
            read = next_request(&mut read_half) => match read {
                Some(bytes) => bytes,
                None => return,
            },
        };

        let request = match decode_message(&bytes) {
            Ok(request) => request,
            Err(e) => {
                debug!(peer = %peer, error = %e, "Closing connection on undecodable request");
                return;
            }
        };

        let mut writer = TcpResponseWriter::new(write_half.clone(), peer);
        handler.serve_dns(&mut writer, &request).await;
    }
}

async fn next_request(read_half: &mut OwnedReadHalf) -> Option<Vec<u8>> {
    match read_framed(read_half).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                debug!(error = %e, "TCP read failed");
            }
            None
        }
    }
}
