use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Message;
use tracing::info;

use fleet_dns_application::ports::Clock;

use crate::dns::handler::DnsHandler;
use crate::dns::writer::{InterceptWriter, ResponseWriter};

/// Logs one line per served request: which handler answered, the
/// question, the rcode and the time spent. The line is emitted from the
/// response's write path, so handlers that never write log nothing.
pub struct RequestLoggerHandler {
    child: Arc<dyn DnsHandler>,
    clock: Arc<dyn Clock>,
}

impl RequestLoggerHandler {
    pub fn new(child: Arc<dyn DnsHandler>, clock: Arc<dyn Clock>) -> Self {
        Self { child, clock }
    }
}

#[async_trait]
impl DnsHandler for RequestLoggerHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        let start = self.clock.now();
        let clock = self.clock.clone();
        let handler = self.child.name();
        let protocol = writer.protocol();
        let (question, query_type) = match request.queries().first() {
            Some(query) => (query.name().to_utf8(), query.query_type().to_string()),
            None => ("-".to_string(), "-".to_string()),
        };

        let mut intercepting = InterceptWriter::new(writer, move |response: &Message| {
            let elapsed = clock.now().duration_since(start);
            info!(
                handler,
                rcode = ?response.response_code(),
                query_type = %query_type,
                question = %question,
                protocol = %protocol,
                elapsed_us = elapsed.as_micros() as u64,
                "Request served"
            );
        });

        self.child.serve_dns(&mut intercepting, request).await;
    }

    fn name(&self) -> &'static str {
        "RequestLoggerHandler"
    }
}
