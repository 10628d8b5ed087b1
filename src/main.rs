//! Prompt Gateway - serve curated prompts to local tool-calling clients

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use prompt_gateway::{
    InMemoryPromptStore, PromptStore,
    cli::{Cli, Command},
    config::Config,
    gateway::Gateway,
    mint_secure_hash, setup_tracing,
    store::load_prompt_file,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::MintHash { count }) => run_mint_hash(count),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Print fresh secure hashes, one per line
fn run_mint_hash(count: usize) -> ExitCode {
    for _ in 0..count {
        println!("{}", mint_secure_hash());
    }
    ExitCode::SUCCESS
}

/// Run the gateway until a shutdown signal arrives
async fn run_server(cli: Cli) -> ExitCode {
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host.clone_from(host);
    }
    if cli.prompts.is_some() {
        config.prompts_file = cli.prompts;
    }

    let store: Arc<dyn PromptStore> = match config.prompts_file.as_deref() {
        Some(path) => match load_prompt_file(path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to load prompts: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("No prompts file configured; serving an empty catalog");
            Arc::new(InMemoryPromptStore::new())
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        exposed = config.exposed.len(),
        "Starting Prompt Gateway"
    );

    let gateway = Gateway::new(config.server, store);
    gateway.set_exposed_prompts(&config.exposed);

    let port = match gateway.start().await {
        Ok(port) => port,
        Err(e) => {
            error!("Failed to start gateway: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(port, "Gateway listening");

    shutdown_signal().await;

    if let Err(e) = gateway.stop().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
