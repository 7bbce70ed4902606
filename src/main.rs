use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use mill_chat::net::tcp::config::{ServerConfig, DEFAULT_PORT};

/// Multi-client TCP chat room.
#[derive(Debug, Parser)]
#[command(name = "mill-chat", version, about)]
struct Cli {
    /// Port to listen on, 1-65535
    port: Option<String>,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Parses a port argument, rejecting anything outside 1-65535.
fn parse_port(arg: &str) -> Option<u16> {
    arg.trim().parse::<u16>().ok().filter(|port| *port != 0)
}

fn resolve_port(arg: Option<&str>) -> u16 {
    match arg {
        None => DEFAULT_PORT,
        Some(arg) => parse_port(arg).unwrap_or_else(|| {
            warn!("invalid port number, using default port {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let port = resolve_port(cli.port.as_deref());

    info!("Starting server on port {port}...");
    let config = ServerConfig::builder().port(port).build();
    if let Err(err) = mill_chat::start(config) {
        error!(error = %err, "server exited with error");
        return Err(err.into());
    }

    Ok(())
}
