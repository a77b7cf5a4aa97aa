//! Skirmish - realtime initiative tracker server
//!
//! Loads the GM directory, binds the TCP server, and runs until ctrl-c.
//! All room state is memory-resident; restarting the process starts from
//! an empty store by design.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish_net::{Server, ServerConfig};

mod config;
mod gm_file;
mod netinfo;

use config::Config;
use gm_file::FileDirectory;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Skirmish server");

    let config = Config::from_env();

    let directory = match FileDirectory::load(&config.gm_file) {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            tracing::error!(
                path = %config.gm_file.display(),
                error = %e,
                "Failed to load GM directory"
            );
            std::process::exit(1);
        }
    };

    let advertised_host = netinfo::local_ip().to_string();
    tracing::info!(host = %advertised_host, port = config.port, "Advertising address");

    let server = match Server::start(
        ServerConfig {
            bind: config.bind,
            port: config.port,
            advertised_host,
        },
        directory,
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %server.addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to wait for shutdown signal");
    }
    server.shutdown();
    tracing::info!("Shutdown complete");
}
