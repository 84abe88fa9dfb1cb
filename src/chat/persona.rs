// src/chat/persona.rs — System instruction framing the assistant's persona

use std::path::{Path, PathBuf};

use crate::infra::config::PersonaConfig;
use crate::infra::paths;

const DEFAULT_PERSONA: &str = include_str!("../../templates/PERSONA.md");
const MAX_PERSONA_CHARS: usize = 20_000;

/// The resolved system instruction for a server or REPL run.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub name: String,
    pub instruction: String,
    pub source: PersonaSource,
}

/// Where the persona was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonaSource {
    /// Built-in template
    Default,
    /// `[persona] instruction` in config.toml
    Config,
    /// ~/.banter/PERSONA.md
    UserFile(PathBuf),
    /// .banter/PERSONA.md in the working directory
    WorkspaceFile(PathBuf),
}

impl std::fmt::Display for PersonaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Config => write!(f, "config"),
            Self::UserFile(p) => write!(f, "user:{}", p.display()),
            Self::WorkspaceFile(p) => write!(f, "workspace:{}", p.display()),
        }
    }
}

/// Load the persona with priority: workspace > user > config > default.
pub fn load_persona(config: &PersonaConfig) -> Persona {
    load_persona_from(
        &paths::workspace_persona_path(),
        &paths::persona_path(),
        config,
    )
}

pub fn load_persona_from(workspace: &Path, user: &Path, config: &PersonaConfig) -> Persona {
    let (raw, source) = if let Some(content) = read_nonempty(workspace) {
        (content, PersonaSource::WorkspaceFile(workspace.into()))
    } else if let Some(content) = read_nonempty(user) {
        (content, PersonaSource::UserFile(user.into()))
    } else if let Some(inline) = config.instruction.as_ref().filter(|s| !s.trim().is_empty()) {
        (inline.clone(), PersonaSource::Config)
    } else {
        (DEFAULT_PERSONA.to_string(), PersonaSource::Default)
    };

    let instruction = truncate(&render(&raw, &config.name), MAX_PERSONA_CHARS);
    tracing::debug!(source = %source, chars = instruction.len(), "Persona loaded");

    Persona {
        name: config.name.clone(),
        instruction,
        source,
    }
}

fn read_nonempty(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        None
    } else {
        Some(content)
    }
}

/// Substitute `{{ name }}`. A persona that isn't a valid template is used as-is.
fn render(raw: &str, name: &str) -> String {
    let env = minijinja::Environment::new();
    match env.render_str(raw, minijinja::context! { name => name }) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Persona template did not render ({e}); using it verbatim");
            raw.to_string()
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
