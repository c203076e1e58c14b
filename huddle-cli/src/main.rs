use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_server::{DEFAULT_BIND_ADDR, DEFAULT_WS_PATH, ServerConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Signaling relay for two-party WebRTC calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "HUDDLE_BIND", default_value_t = DEFAULT_BIND_ADDR)]
        bind: SocketAddr,

        #[arg(long, env = "HUDDLE_WS_PATH", default_value = DEFAULT_WS_PATH)]
        ws_path: String,

        /// Log filter, e.g. `info` or `huddle_server=debug`. Falls back to RUST_LOG.
        #[arg(long, env = "HUDDLE_LOG")]
        log: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, ws_path, log } => {
            init_logging(log.as_deref())?;

            if !ws_path.starts_with('/') {
                anyhow::bail!("--ws-path must start with '/', got '{}'", ws_path);
            }

            println!("{}", "📡 Starting Huddle relay...".green().bold());
            println!("   🔌 WebSocket: ws://{}{}", bind, ws_path);
            println!("   🩺 Health:    http://{}/health", bind);

            huddle_server::serve(ServerConfig { bind, ws_path }).await?;

            println!("{}", "👋 Relay stopped".cyan());
        }
    }

    Ok(())
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(filter) => EnvFilter::try_new(filter).context("Invalid log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
