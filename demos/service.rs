use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use graceful_supervisor::{SupervisorBuilder, TaskResult};
use tokio::{io::AsyncWriteExt, net::TcpListener};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const APP_NAME: &str = "service";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version)]
struct Args {
    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Address for the server to listen to.
    #[arg(long, default_value = "127.0.0.1")]
    address: String,
    /// Port for the server to listen to.
    #[arg(long, default_value_t = 10002)]
    port: u16,
    /// Time allowed for every task to stop, 0 for the supervisor default.
    #[arg(long, default_value_t = 0)]
    shutdown_timeout_ms: u64,
}

/// Greets every connection with one line, until cancelled.
async fn serve(listener: TcpListener, token: CancellationToken) -> TaskResult {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("listener stopping");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (mut stream, peer) = accepted?;
                info!(%peer, "connection accepted");
                tokio::spawn(async move {
                    if let Err(err) = stream.write_all(b"hello from service\n").await {
                        warn!(%peer, error = %err, "failed to answer");
                    }
                });
            }
        }
    }
}

fn parse_log_level(raw: &str) -> Option<LevelFilter> {
    raw.parse().ok()
}

fn init_logging(raw: &str) {
    let level = parse_log_level(raw);
    let filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(LevelFilter::INFO).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if level.is_none() {
        warn!("Invalid log level {raw}, set to info");
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let addr = format!("{}:{}", args.address, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding listener on {addr}"))?;
    info!(%addr, "listening");

    SupervisorBuilder::new()
        .with_timeout(Duration::from_millis(args.shutdown_timeout_ms))
        .with_task(move |token: CancellationToken| serve(listener, token))
        .build()
        .run()
        .await
        .context("running service")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);
    info!("Server {} version {}", APP_NAME, env!("CARGO_PKG_VERSION"));
    info!(level = %args.log_level, "logging initialized");

    if let Err(err) = run(args).await {
        error!("Fatal error: {err:#}");
        std::process::exit(1);
    }
    info!("Server stopped gracefully");
}
