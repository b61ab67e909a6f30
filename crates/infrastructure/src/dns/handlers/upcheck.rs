use std::net::Ipv4Addr;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use tracing::error;

use crate::dns::handler::{reply_with_rcode, DnsHandler};
use crate::dns::writer::ResponseWriter;

/// Answers its reserved names with a fixed loopback A record, so load
/// balancers and the bind watchdog always have a query that must
/// succeed while the server is up.
#[derive(Debug, Default)]
pub struct UpcheckHandler;

impl UpcheckHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DnsHandler for UpcheckHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        let mut response = reply_with_rcode(request, ResponseCode::NoError);
        response.set_authoritative(true);
        response.set_recursion_available(false);

        if let Some(query) = request.queries().first() {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                0,
                RData::A(A(Ipv4Addr::LOCALHOST)),
            ));
        }

        if let Err(e) = writer.write_msg(&response).await {
            error!(error = %e, "Failed to write upcheck response");
        }
    }

    fn name(&self) -> &'static str {
        "UpcheckHandler"
    }
}
