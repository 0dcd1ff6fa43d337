//! Runs a Homestead server until Ctrl-C.
//!
//! ```text
//! farm-server [path/to/server.json]
//! ```
//!
//! Without a path the built-in defaults are used. `RUST_LOG` overrides the
//! log filter.

use homestead::prelude::*;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_logging("info,homestead=debug");

    if let Err(e) = run().await {
        error!(error = %e, "farm server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), HomesteadError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading config");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };

    let mut server = HomesteadServer::builder().config(config).start()?;

    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
        }
        handle.shutdown();
    });

    server.run().await
}
