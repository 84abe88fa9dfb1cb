// src/cli/serve.rs — `banter serve`

use crate::api::page::PageRenderer;
use crate::api::{self, ApiState};
use crate::chat::SessionRegistry;
use crate::infra::config::Config;

use super::Wiring;

/// Build the session registry and page renderer, then serve until ctrl-c.
pub async fn run_serve(wiring: Wiring, config: &Config) -> anyhow::Result<()> {
    let page = PageRenderer::new(&wiring.persona.name, wiring.client.model())?;
    let registry = SessionRegistry::new(
        wiring.client,
        wiring.options,
        config.chat.fallback_message.clone(),
        config.session_idle(),
    );

    let state = ApiState::new(registry, page);
    api::start_server(&config.server, state).await
}
