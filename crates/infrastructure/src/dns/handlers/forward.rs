use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use tracing::{debug, error, warn};

use crate::dns::exchanger::Exchanger;
use crate::dns::handler::{reply_with_rcode, DnsHandler};
use crate::dns::writer::ResponseWriter;

/// Last handler in the chain: relays everything outside the local
/// domain to the configured recursors, trying each in order until one
/// answers. With no recursors configured, or all of them down, the
/// client gets SERVFAIL rather than silence.
pub struct ForwardHandler {
    recursors: Vec<SocketAddr>,
    exchanger: Arc<dyn Exchanger>,
}

impl ForwardHandler {
    pub fn new(recursors: Vec<SocketAddr>, exchanger: Arc<dyn Exchanger>) -> Self {
        Self {
            recursors,
            exchanger,
        }
    }

    async fn write(&self, writer: &mut dyn ResponseWriter, response: &Message) {
        if let Err(e) = writer.write_msg(response).await {
            error!(error = %e, "Failed to write forwarded response");
        }
    }
}

#[async_trait]
impl DnsHandler for ForwardHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        if request.queries().is_empty() {
            let mut response = reply_with_rcode(request, ResponseCode::NoError);
            response.set_authoritative(true);
            self.write(writer, &response).await;
            return;
        }

        let protocol = writer.protocol();
        for recursor in &self.recursors {
            match self.exchanger.exchange(request, protocol, *recursor).await {
                Ok(mut response) => {
                    let mut header = *response;
                    header.set_id(request.id());
                    response.set_header(header);
                    debug!(
                        recursor = %recursor,
                        rcode = ?response.response_code(),
                        "Recursor answered"
                    );
                    self.write(writer, &response).await;
                    return;
                }
                Err(e) => {
                    warn!(recursor = %recursor, error = %e, "Recursor exchange failed");
                }
            }
        }

        self.write(writer, &reply_with_rcode(request, ResponseCode::ServFail))
            .await;
    }

    fn name(&self) -> &'static str {
        "ForwardHandler"
    }
}
