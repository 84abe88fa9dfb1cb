// src/cli/mod.rs — CLI definition (clap derive)

pub mod chat;
pub mod serve;
pub mod status;

use clap::{Parser, Subcommand};

use crate::chat::persona::{self, Persona};
use crate::chat::{CompletionClient, CompletionOptions};
use crate::infra::config::Config;
use crate::provider::resolver;

#[derive(Parser)]
#[command(name = "banter", about = "Chat with a hosted LLM from your browser or terminal", version)]
pub struct Cli {
    /// Model id to use (overrides [model] model in config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the chat page (default)
    Serve {
        /// Address to bind (overrides [server] host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Interactive chat in the terminal
    Chat,
    /// Show the effective configuration
    Status,
}

/// Everything a session factory needs: the remote handle, sampling options,
/// and the persona it was built with.
pub struct Wiring {
    pub client: CompletionClient,
    pub options: CompletionOptions,
    pub persona: Persona,
}

/// Resolve provider, credential and persona from config.
pub fn wire(config: &Config) -> anyhow::Result<Wiring> {
    let provider = resolver::build_provider(&config.model)?;
    let persona = persona::load_persona(&config.persona);
    tracing::info!(
        provider = provider.id(),
        model = %config.model.model,
        persona = %persona.source,
        "Completion client ready"
    );
    let client = CompletionClient::new(provider, &config.model.model, &persona.instruction);
    let options = CompletionOptions::from_config(&config.model)?;
    Ok(Wiring {
        client,
        options,
        persona,
    })
}
