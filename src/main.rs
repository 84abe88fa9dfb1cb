// src/main.rs — banter entry point

use clap::Parser;

use banter::cli::{Cli, Commands};
use banter::infra::config::Config;
use banter::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    // Initialize logging (respects RUST_LOG / BANTER_LOG)
    logger::init_logging(&config.log.level);

    if let Some(ref model) = cli.model {
        config.model.model = model.clone();
    }
    if let Some(Commands::Serve { ref host, port }) = cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = port;
        }
    }
    config.validate()?;

    // Dispatch subcommands that don't need a provider
    if let Some(Commands::Status) = cli.command {
        return banter::cli::status::show_status(&config);
    }

    let wiring = banter::cli::wire(&config)?;

    match cli.command {
        Some(Commands::Chat) => banter::cli::chat::run_chat(wiring, &config).await,
        _ => banter::cli::serve::run_serve(wiring, &config).await,
    }
}
