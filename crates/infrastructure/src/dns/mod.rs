pub mod codec;
pub mod exchanger;
pub mod handler;
pub mod handlers;
pub mod server;
pub mod writer;

pub use exchanger::{Exchanger, NetExchanger};
pub use handler::{DnsHandler, HandlerMux};
pub use server::{
    DnsListener, DnsServer, ListenerHealthCheck, ServerError, TcpServerListener, UdpServerListener,
};
pub use writer::{InterceptWriter, ResponseWriter, TcpResponseWriter, UdpResponseWriter};
