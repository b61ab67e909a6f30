//! Handler trait and domain-based request routing.

use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use tracing::{error, warn};

use fleet_dns_domain::names::fqdn;

use super::writer::ResponseWriter;

/// One unit of the serving chain. A handler owns the full fate of a
/// request: it writes the response itself, or delegates to another
/// handler that will. Write failures are logged, never propagated, so a
/// dead client cannot take a worker down.
#[async_trait]
pub trait DnsHandler: Send + Sync {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message);

    /// Short name used in per-request log lines.
    fn name(&self) -> &'static str;
}

/// Starts a response message mirroring the request envelope.
pub(crate) fn reply_with_rcode(request: &Message, rcode: ResponseCode) -> Message {
    let mut response = Message::new(request.id(), MessageType::Response, request.op_code());
    response.set_recursion_desired(request.recursion_desired());
    response.set_response_code(rcode);
    response.add_queries(request.queries().to_vec());
    response
}

/// Routes requests to the handler registered for the longest matching
/// domain suffix. A handler registered for `.` catches everything that
/// nothing more specific claims.
pub struct HandlerMux {
    entries: Vec<(String, Arc<dyn DnsHandler>)>,
}

impl HandlerMux {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `handler` for `domain` and everything beneath it.
    pub fn handle(&mut self, domain: &str, handler: Arc<dyn DnsHandler>) {
        self.entries.push((fqdn(domain), handler));
    }

    fn lookup(&self, name: &str) -> Option<&Arc<dyn DnsHandler>> {
        let name = fqdn(name);
        self.entries
            .iter()
            .filter(|(domain, _)| domain_matches(&name, domain))
            .max_by_key(|(domain, _)| domain.len())
            .map(|(_, handler)| handler)
    }
}

impl Default for HandlerMux {
    fn default() -> Self {
        Self::new()
    }
}

/// Suffix match on label boundaries: `web.fleet.` is under `fleet.` but
/// `notfleet.` is not.
fn domain_matches(name: &str, domain: &str) -> bool {
    if domain == "." {
        return true;
    }
    name == domain || name.ends_with(&format!(".{}", domain))
}

#[async_trait]
impl DnsHandler for HandlerMux {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        let handler = request
            .queries()
            .first()
            .and_then(|query| self.lookup(&query.name().to_utf8()));

        match handler {
            Some(handler) => handler.serve_dns(writer, request).await,
            None => {
                warn!("No handler registered for request, serving SERVFAIL");
                let response = reply_with_rcode(request, ResponseCode::ServFail);
                if let Err(e) = writer.write_msg(&response).await {
                    error!(error = %e, "Failed to write SERVFAIL response");
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "HandlerMux"
    }
}
