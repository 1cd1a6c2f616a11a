//! FRC 2024 Field Server
//!
//! Accepts amp and speaker devices over TCP and runs the match.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use field_server::{
    operator::run_stdin_console,
    FieldServer, GameState, ServerConfig, TICK_PERIOD, VERSION,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value = "23")]
    port: u16,
    /// Disable the operator console on stdin
    #[clap(long)]
    no_console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid address {}:{}", args.host, args.port))?;

    info!("Field Server v{}", VERSION);
    info!("Tick period: {:?}", TICK_PERIOD);

    let server = FieldServer::new(ServerConfig {
        bind_addr,
        ..Default::default()
    });

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (game_loop, scoreboard) = server.game_loop(GameState::new(), commands_rx);
    let game_handle = tokio::spawn(game_loop.run(server.subscribe_shutdown()));

    if !args.no_console {
        tokio::spawn(async move {
            if let Err(e) = run_stdin_console(commands_tx, scoreboard).await {
                error!("Operator console failed: {}", e);
            }
        });
    }

    tokio::select! {
        result = server.run() => {
            result.context("field server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    server.shutdown();
    if let Err(e) = game_handle.await {
        error!("Game loop task failed: {}", e);
    }

    Ok(())
}
