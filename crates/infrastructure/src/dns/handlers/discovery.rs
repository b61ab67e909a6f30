use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use tracing::error;

use fleet_dns_application::ports::DomainResolver;
use fleet_dns_domain::Protocol;

use crate::dns::handler::{reply_with_rcode, DnsHandler};
use crate::dns::writer::ResponseWriter;

/// Serves the local domain from the instance record set.
///
/// Only `A` and `ANY` questions reach the resolver. `AAAA` and `MX` get
/// an empty authoritative success, since instances are addressed by
/// IPv4 only; any other type is refused with SERVFAIL.
pub struct DiscoveryHandler {
    resolver: Arc<dyn DomainResolver>,
}

impl DiscoveryHandler {
    pub fn new(resolver: Arc<dyn DomainResolver>) -> Self {
        Self { resolver }
    }

    async fn build_response(&self, protocol: Protocol, request: &Message) -> Message {
        let mut default = reply_with_rcode(request, ResponseCode::NoError);
        default.set_authoritative(true);
        default.set_recursion_available(false);

        let Some(question) = request.queries().first() else {
            return default;
        };

        match question.query_type() {
            RecordType::A | RecordType::ANY => {
                let name = question.name().to_utf8();
                self.resolver.resolve(&[name], protocol, request).await
            }
            RecordType::AAAA | RecordType::MX => default,
            _ => {
                default.set_response_code(ResponseCode::ServFail);
                default
            }
        }
    }
}

#[async_trait]
impl DnsHandler for DiscoveryHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        let response = self.build_response(writer.protocol(), request).await;
        if let Err(e) = writer.write_msg(&response).await {
            error!(error = %e, "Failed to write discovery response");
        }
    }

    fn name(&self) -> &'static str {
        "DiscoveryHandler"
    }
}
