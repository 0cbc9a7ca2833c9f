//! RAX share server - Entry Point
//!
//! `rax-share-server -p <port> -d <directory> -u <users_file>`

use clap::Parser;
use log::{info, warn};

use rax_share_server::error::ServerError;
use rax_share_server::error::handlers::handle_error;
use rax_share_server::{Cli, Server, ServerConfig, ServerContext};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default `info` filter
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Launching share server...");

    if let Err(e) = run(Cli::parse()).await {
        handle_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let config = ServerConfig::load(&cli)?;

    // The user table is complete before the listener exists.
    let context = ServerContext::load(&config)?;
    let server = Server::bind(&config, context).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                shutdown.shutdown();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    server.start().await;
    Ok(())
}
