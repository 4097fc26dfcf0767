use anyhow::Result;
use clap::Parser;
use spectrum_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Port to listen on for metrics (overrides config)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Leave the exporter's own process metrics out of scrapes
    #[arg(long, env = "EXPORTER_DISABLE_EXPORTER_METRICS")]
    disable_exporter_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Spectrum Virtualize Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if args.disable_exporter_metrics {
        config.server.exporter_metrics = false;
    }

    info!("Configuration loaded successfully");
    for target in &config.targets {
        info!("Target: {} ({})", target.address, target.rest_url());
    }
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
