// src/provider/resolver.rs — Build the configured provider

use std::sync::Arc;
use std::time::Duration;

use super::google::GoogleProvider;
use super::openai_compat::OpenAICompatProvider;
use super::ModelProvider;
use crate::infra::config::ModelConfig;
use crate::infra::errors::BanterError;

/// Resolve the API key from the configured env var and build the provider.
pub fn build_provider(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, BanterError> {
    let key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| BanterError::MissingCredential {
            env_var: config.api_key_env.clone(),
        })?;
    build_provider_with_key(config, key)
}

pub fn build_provider_with_key(
    config: &ModelConfig,
    api_key: String,
) -> Result<Arc<dyn ModelProvider>, BanterError> {
    let timeout = match config.request_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let base_url = Some(config.base_url.clone()).filter(|u| !u.trim().is_empty());

    let provider: Arc<dyn ModelProvider> = match config.provider.as_str() {
        "google" | "gemini" => Arc::new(GoogleProvider::with_options(api_key, base_url, timeout)),
        "openai_compat" | "openai" => {
            let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".into());
            Arc::new(OpenAICompatProvider::new(
                "openai_compat",
                api_key,
                base_url,
                config.model.clone(),
                timeout,
            ))
        }
        other => return Err(BanterError::UnknownProvider(other.to_string())),
    };

    tracing::debug!(provider = provider.id(), model = %config.model, "Provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_is_default() {
        let p = build_provider_with_key(&ModelConfig::default(), "k".into()).unwrap();
        assert_eq!(p.id(), "google");
    }

    #[test]
    fn test_openai_compat() {
        let config = ModelConfig {
            provider: "openai_compat".into(),
            model: "llama".into(),
            ..Default::default()
        };
        let p = build_provider_with_key(&config, "k".into()).unwrap();
        assert_eq!(p.id(), "openai_compat");
        assert_eq!(p.models()[0].id, "llama");
    }

    #[test]
    fn test_unknown_provider() {
        let config = ModelConfig {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = build_provider_with_key(&config, "k".into()).err().unwrap();
        assert!(matches!(err, BanterError::UnknownProvider(ref p) if p == "carrier-pigeon"));
    }

    #[test]
    fn test_missing_credential() {
        let config = ModelConfig {
            api_key_env: "BANTER_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let err = build_provider(&config).err().unwrap();
        assert!(err.to_string().contains("BANTER_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
