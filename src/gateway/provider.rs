//! HTTP gateway dispatching agent calls to their provider

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::anthropic::{self, MessagesRequest};
use super::credentials::CredentialSource;
use super::openai::{self, ChatCompletionRequest};
use super::ModelGateway;
use crate::config::{DialogConfig, GatewayConfig};
use crate::error::{DialogError, DialogResult};
use crate::value_objects::{Agent, AgentId, ChatMessage, ProviderBinding, ProviderKind};

/// How requests reach the providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Call provider APIs with keys from the credential source
    Direct,
    /// Post to a gateway process (`{base_url}/api/claude`, `/api/deepseek`)
    /// that holds the keys itself
    Relay { base_url: String },
}

/// [`ModelGateway`] backed by the real provider APIs
pub struct ProviderGateway {
    client: Client,
    endpoints: GatewayConfig,
    transport: Transport,
    credentials: Arc<dyn CredentialSource>,
    bindings: HashMap<AgentId, ProviderBinding>,
}

impl ProviderGateway {
    pub fn new(endpoints: GatewayConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        let transport = match &endpoints.relay_url {
            Some(base_url) => Transport::Relay {
                base_url: base_url.clone(),
            },
            None => Transport::Direct,
        };

        Self {
            client: Client::new(),
            endpoints,
            transport,
            credentials,
            bindings: HashMap::new(),
        }
    }

    /// Gateway for every agent of the configured roster
    pub fn from_config(config: &DialogConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        let mut gateway = Self::new(config.gateway.clone(), credentials);
        for agent in config.roster() {
            gateway.bind(&agent);
        }
        gateway
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Route calls for `agent` to its provider binding
    pub fn bind(&mut self, agent: &Agent) {
        self.bindings.insert(agent.id.clone(), agent.binding.clone());
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// URL a request for `provider` is posted to
    pub fn endpoint(&self, provider: ProviderKind) -> String {
        match (&self.transport, provider) {
            (Transport::Direct, ProviderKind::Anthropic) => self.endpoints.anthropic_url.clone(),
            (Transport::Direct, ProviderKind::DeepSeek) => self.endpoints.deepseek_url.clone(),
            (Transport::Relay { base_url }, provider) => format!(
                "{}/api/{}",
                base_url.trim_end_matches('/'),
                provider.relay_segment()
            ),
        }
    }

    fn api_key(&self, provider: ProviderKind) -> DialogResult<Option<String>> {
        match self.transport {
            Transport::Direct => self.credentials.api_key(provider).map(Some),
            Transport::Relay { .. } => Ok(None),
        }
    }
}

#[async_trait]
impl ModelGateway for ProviderGateway {
    async fn call(
        &self,
        agent: &AgentId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> DialogResult<String> {
        let binding = self.bindings.get(agent).ok_or_else(|| {
            DialogError::Config(format!("no provider binding for agent {agent}"))
        })?;

        let url = self.endpoint(binding.provider);
        let api_key = self.api_key(binding.provider)?;
        debug!(
            %agent,
            provider = %binding.provider,
            %url,
            history = history.len(),
            "calling model"
        );

        let result = match binding.provider {
            ProviderKind::Anthropic => {
                let body = MessagesRequest::new(binding, prompt, history);
                anthropic::send(
                    &self.client,
                    &url,
                    &self.endpoints.anthropic_version,
                    api_key.as_deref(),
                    &body,
                )
                .await
            }
            ProviderKind::DeepSeek => {
                let body = ChatCompletionRequest::new(binding, prompt, history);
                openai::send(&self.client, &url, api_key.as_deref(), &body).await
            }
        };

        if let Err(err) = &result {
            warn!(%agent, provider = %binding.provider, error = %err, "model call failed");
        }
        result
    }
}
