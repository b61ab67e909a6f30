use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Message;
use thiserror::Error;
use tracing::{error, info};

use fleet_dns_application::ports::{Clock, DomainResolver};
use fleet_dns_domain::AliasConfig;

use crate::dns::handler::DnsHandler;
use crate::dns::writer::ResponseWriter;

use super::request_logger::RequestLoggerHandler;

#[derive(Error, Debug)]
#[error("must configure with non-recursing alias config")]
pub struct NotReducedError;

/// First stop for every request: when the queried name is an alias, the
/// request is answered from its target names; everything else falls
/// through to the wrapped handler untouched.
pub struct AliasResolvingHandler {
    child: Arc<dyn DnsHandler>,
    config: AliasConfig,
    resolver: Arc<dyn DomainResolver>,
    clock: Arc<dyn Clock>,
}

impl AliasResolvingHandler {
    /// Fails when `config` still contains alias-of-alias chains; those
    /// must be reduced before serving so lookup stays single-pass.
    pub fn new(
        child: Arc<dyn DnsHandler>,
        config: AliasConfig,
        resolver: Arc<dyn DomainResolver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NotReducedError> {
        if !config.is_reduced() {
            return Err(NotReducedError);
        }

        Ok(Self {
            child,
            config,
            resolver,
            clock,
        })
    }
}

#[async_trait]
impl DnsHandler for AliasResolvingHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        if let Some(query) = request.queries().first() {
            let alias_domains = self.config.resolutions(&query.name().to_utf8());
            if !alias_domains.is_empty() {
                info!(
                    alias = %query.name().to_utf8(),
                    domains = ?alias_domains,
                    protocol = %writer.protocol(),
                    "Resolving alias"
                );
                let aliased = AliasedDomainsHandler {
                    resolver: self.resolver.clone(),
                    domains: alias_domains,
                };
                let logging = RequestLoggerHandler::new(Arc::new(aliased), self.clock.clone());
                logging.serve_dns(writer, request).await;
                return;
            }
        }

        self.child.serve_dns(writer, request).await;
    }

    fn name(&self) -> &'static str {
        "AliasResolvingHandler"
    }
}

/// One-shot handler resolving a fixed set of target names on behalf of
/// the alias the request actually asked for.
struct AliasedDomainsHandler {
    resolver: Arc<dyn DomainResolver>,
    domains: Vec<String>,
}

#[async_trait]
impl DnsHandler for AliasedDomainsHandler {
    async fn serve_dns(&self, writer: &mut dyn ResponseWriter, request: &Message) {
        let response = self
            .resolver
            .resolve(&self.domains, writer.protocol(), request)
            .await;

        if let Err(e) = writer.write_msg(&response).await {
            error!(error = %e, "Failed to write aliased response");
        }
    }

    fn name(&self) -> &'static str {
        "AliasedDomainsHandler"
    }
}
