use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fleet_dns_domain::{AliasConfig, Config};
use fleet_dns_infrastructure::alias_files::load_alias_directory;
use fleet_dns_infrastructure::dns::handlers::{
    AliasResolvingHandler, DiscoveryHandler, ForwardHandler, RequestLoggerHandler, UpcheckHandler,
};
use fleet_dns_infrastructure::dns::{DnsHandler, HandlerMux, NetExchanger};

use super::DnsServices;

/// Builds the full serving chain: request logging around alias
/// resolution around the mux of upcheck, discovery, and forward
/// handlers.
pub fn build_handler_chain(
    config: &Config,
    services: &DnsServices,
) -> anyhow::Result<Arc<dyn DnsHandler>> {
    let recursors = parse_recursors(&config.recursors)?;
    let exchanger = Arc::new(NetExchanger::new(config.recursor_timeout()));

    let mut mux = HandlerMux::new();
    for domain in &config.upcheck_domains {
        mux.handle(domain, Arc::new(UpcheckHandler::new()));
    }
    mux.handle(
        &config.local_domain,
        Arc::new(DiscoveryHandler::new(services.resolver.clone())),
    );
    mux.handle(".", Arc::new(ForwardHandler::new(recursors, exchanger)));

    let aliases = load_aliases(config)?;
    let handler = AliasResolvingHandler::new(
        Arc::new(mux),
        aliases,
        services.resolver.clone(),
        services.clock.clone(),
    )?;

    Ok(Arc::new(RequestLoggerHandler::new(
        Arc::new(handler),
        services.clock.clone(),
    )))
}

fn parse_recursors(raw: &[String]) -> anyhow::Result<Vec<SocketAddr>> {
    raw.iter()
        .map(|recursor| {
            recursor
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid recursor address '{recursor}'"))
        })
        .collect()
}

fn load_aliases(config: &Config) -> anyhow::Result<AliasConfig> {
    let Some(dir) = &config.alias_files_dir else {
        return Ok(AliasConfig::new());
    };

    let aliases = load_alias_directory(Path::new(dir))?;
    info!(dir = %dir, count = aliases.len(), "Loaded alias configuration");
    Ok(aliases.reduced_form()?)
}
