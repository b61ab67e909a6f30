//! Response writers.
//!
//! A handler never touches sockets directly; it writes the finished
//! message through a [`ResponseWriter`] bound to the transport the
//! request arrived on. [`InterceptWriter`] lets a decorating handler
//! observe the response on its way out.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Message;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use fleet_dns_domain::Protocol;

use super::codec::{encode_message, write_framed};

#[async_trait]
pub trait ResponseWriter: Send {
    /// Address of the requesting client.
    fn remote_addr(&self) -> SocketAddr;

    /// Transport the request arrived on.
    fn protocol(&self) -> Protocol;

    /// Encodes and sends one response message.
    async fn write_msg(&mut self, response: &Message) -> io::Result<()>;
}

fn encoding_error(e: fleet_dns_domain::DnsError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

pub struct UdpResponseWriter {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
}

impl UdpResponseWriter {
    pub fn new(socket: Arc<UdpSocket>, remote: SocketAddr) -> Self {
        Self { socket, remote }
    }
}

#[async_trait]
impl ResponseWriter for UdpResponseWriter {
    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    async fn write_msg(&mut self, response: &Message) -> io::Result<()> {
        let bytes = encode_message(response).map_err(encoding_error)?;
        self.socket.send_to(&bytes, self.remote).await?;
        Ok(())
    }
}

/// Writes responses back over an accepted TCP connection. The write half
/// is shared so successive requests on one connection reuse it.
pub struct TcpResponseWriter {
    write_half: Arc<Mutex<OwnedWriteHalf>>,
    remote: SocketAddr,
}

impl TcpResponseWriter {
    pub fn new(write_half: Arc<Mutex<OwnedWriteHalf>>, remote: SocketAddr) -> Self {
        Self { write_half, remote }
    }
}

#[async_trait]
impl ResponseWriter for TcpResponseWriter {
    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    async fn write_msg(&mut self, response: &Message) -> io::Result<()> {
        let bytes = encode_message(response).map_err(encoding_error)?;
        let mut write_half = self.write_half.lock().await;
        write_framed(&mut *write_half, &bytes).await
    }
}

/// Wraps another writer, invoking the observer with each response before
/// it is passed on. The observer sees the response even when the inner
/// write then fails.
pub struct InterceptWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    observer: Box<dyn FnMut(&Message) + Send + 'a>,
}

impl<'a> InterceptWriter<'a> {
    pub fn new(
        inner: &'a mut dyn ResponseWriter,
        observer: impl FnMut(&Message) + Send + 'a,
    ) -> Self {
        Self {
            inner,
            observer: Box::new(observer),
        }
    }
}

#[async_trait]
impl ResponseWriter for InterceptWriter<'_> {
    fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr()
    }

    fn protocol(&self) -> Protocol {
        self.inner.protocol()
    }

    async fn write_msg(&mut self, response: &Message) -> io::Result<()> {
        (self.observer)(response);
        self.inner.write_msg(response).await
    }
}
