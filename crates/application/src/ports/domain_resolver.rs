use async_trait::async_trait;
use fleet_dns_domain::Protocol;
use hickory_proto::op::Message;

/// Resolves a set of candidate local names into a complete response
/// message. Both the discovery handler and the alias handler go through
/// this port; the candidates differ (the raw question name vs. the
/// alias targets) but the response construction is shared.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve(&self, domains: &[String], protocol: Protocol, request: &Message) -> Message;
}
