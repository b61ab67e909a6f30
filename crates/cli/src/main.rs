use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fleet_dns_domain::CliOverrides;
use fleet_dns_infrastructure::{ExecCommandRunner, ResolvConfManager, SystemClock};

mod bootstrap;
mod di;

#[derive(Parser)]
#[command(name = "fleet-dns")]
#[command(version)]
#[command(about = "Fleet DNS - service discovery DNS for orchestrated instances")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// DNS server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        address: cli.bind.clone(),
        port: cli.port,
        log_level: cli.log_level.clone(),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Fleet DNS v{}", env!("CARGO_PKG_VERSION"));

    let services = di::DnsServices::new(&config).await?;
    let handler = di::build_handler_chain(&config, &services)?;

    let shutdown = CancellationToken::new();
    let server = di::build_server(&config, handler, shutdown.clone())?;

    spawn_signal_listener(shutdown);

    if config.override_nameserver {
        spawn_nameserver_override(config.address.clone());
    }

    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
        shutdown.cancel();
    });
}

/// Points the host resolver at this server in the background. Failure
/// is logged, not fatal.
fn spawn_nameserver_override(address: String) {
    tokio::spawn(async move {
        let manager = ResolvConfManager::new(
            Arc::new(SystemClock::new()),
            Arc::new(ExecCommandRunner::new()),
        );
        if let Err(e) = manager.set_primary(&address).await {
            error!(error = %e, "Failed to make this server the primary nameserver");
        }
    });
}
