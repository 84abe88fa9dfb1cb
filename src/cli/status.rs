// src/cli/status.rs — `banter status`: effective configuration

use crate::chat::persona;
use crate::infra::config::Config;
use crate::infra::paths;

/// Print the effective configuration. Only the credential's env var name and
/// whether it is set are shown, never its value.
pub fn show_status(config: &Config) -> anyhow::Result<()> {
    let config_path = paths::config_file_path();
    println!("banter v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Config file: {} ({})",
        config_path.display(),
        if config_path.exists() { "found" } else { "defaults" }
    );
    println!("  Credential: {}", credential_line(config));

    let persona = persona::load_persona(&config.persona);
    println!("  Persona: {} ({})", persona.name, persona.source);
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn credential_line(config: &Config) -> String {
    let env_var = &config.model.api_key_env;
    let set = std::env::var(env_var).map(|v| !v.trim().is_empty()).unwrap_or(false);
    format!("{env_var} {}", if set { "is set" } else { "is NOT set" })
}
