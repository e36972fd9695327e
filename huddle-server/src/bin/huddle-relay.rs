use anyhow::{Context, Result};
use clap::Parser;
use huddle_server::{SignalingService, serve};
use std::net::{IpAddr, SocketAddr};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle-relay")]
#[command(about = "WebSocket signaling relay for huddle rooms")]
struct Args {
    #[arg(long, env = "HUDDLE_IP", default_value = "127.0.0.1")]
    ip: IpAddr,

    #[arg(long, env = "HUDDLE_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let addr = SocketAddr::new(args.ip, args.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, SignalingService::new()).await
}
