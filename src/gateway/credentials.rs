//! Credential resolution for provider calls

use std::collections::HashMap;
use std::env;

use crate::error::{DialogError, DialogResult};
use crate::value_objects::ProviderKind;

/// Where provider API keys come from
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, provider: ProviderKind) -> DialogResult<String>;
}

/// Keys held by the process environment
///
/// Anthropic reads `ANTHROPIC_API_KEY`, falling back to `CLAUDE_API_KEY`;
/// DeepSeek reads `DEEPSEEK_API_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn variables(provider: ProviderKind) -> &'static [&'static str] {
        match provider {
            ProviderKind::Anthropic => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
            ProviderKind::DeepSeek => &["DEEPSEEK_API_KEY"],
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn api_key(&self, provider: ProviderKind) -> DialogResult<String> {
        let names = Self::variables(provider);
        names
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                DialogError::Config(format!(
                    "{provider} API key not configured (set {})",
                    names.join(" or ")
                ))
            })
    }
}

/// Keys handed over explicitly by the caller
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    keys: HashMap<ProviderKind, String>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: ProviderKind, key: impl Into<String>) -> Self {
        self.insert(provider, key);
        self
    }

    pub fn insert(&mut self, provider: ProviderKind, key: impl Into<String>) {
        self.keys.insert(provider, key.into());
    }
}

impl CredentialSource for KeyMap {
    fn api_key(&self, provider: ProviderKind) -> DialogResult<String> {
        self.keys
            .get(&provider)
            .filter(|key| !key.trim().is_empty())
            .cloned()
            .ok_or_else(|| DialogError::Config(format!("no {provider} API key provided")))
    }
}
