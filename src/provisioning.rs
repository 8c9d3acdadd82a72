//! Assistant identity resolution
//!
//! A call against the assistant backend needs an assistant id. It comes from,
//! in order: the demo id (when asked for), the deployment-wide id, or a fresh
//! assistant created through the provisioning API.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::business::BusinessConfig;
use crate::error::{SessionError, SessionResult};
use crate::transport::AssistantId;

/// Remote assistant creation
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> SessionResult<AssistantId>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantRequest {
    pub name: String,
    pub model: AssistantModel,
    pub voice: AssistantVoice,
    pub first_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantModel {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantVoice {
    pub provider: String,
    pub voice_id: String,
}

impl CreateAssistantRequest {
    pub fn for_business(business: &BusinessConfig) -> Self {
        let settings = business.tone.settings();

        Self {
            name: business.assistant_name(),
            model: AssistantModel {
                provider: "openai".to_string(),
                model: settings.model.to_string(),
                temperature: settings.temperature,
                messages: vec![PromptMessage {
                    role: "system".to_string(),
                    content: business.system_prompt(),
                }],
            },
            voice: AssistantVoice {
                provider: "11labs".to_string(),
                voice_id: business.voice.provider_voice_id().to_string(),
            },
            first_message: business.first_message(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateAssistantResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Provisioning API over HTTPS
pub struct HttpAssistantApi {
    client: reqwest::Client,
    api_base: String,
    server_key: String,
}

impl HttpAssistantApi {
    pub fn new(api_base: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            server_key: server_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl AssistantApi for HttpAssistantApi {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> SessionResult<AssistantId> {
        let url = format!("{}/assistant", self.api_base);
        debug!("Creating assistant at {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.server_key)
            .json(request)
            .send()
            .await
            .map_err(|e| SessionError::Provisioning(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Provisioning(format!(
                "failed to create assistant: HTTP {}",
                status
            )));
        }

        let body: CreateAssistantResponse = response
            .json()
            .await
            .map_err(|e| SessionError::Provisioning(format!("invalid response: {}", e)))?;

        match body.id {
            Some(id) if !id.is_empty() => Ok(AssistantId::new(id)),
            _ => Err(SessionError::Provisioning(
                "response did not contain an assistant id".to_string(),
            )),
        }
    }
}

/// Resolves the assistant a call should use
#[derive(Clone, Default)]
pub struct AssistantProvisioner {
    assistant_id: Option<AssistantId>,
    demo_assistant_id: Option<AssistantId>,
    api: Option<Arc<dyn AssistantApi>>,
}

impl AssistantProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assistant_id(mut self, id: Option<String>) -> Self {
        self.assistant_id = non_empty(id).map(AssistantId::new);
        self
    }

    pub fn with_demo_assistant_id(mut self, id: Option<String>) -> Self {
        self.demo_assistant_id = non_empty(id).map(AssistantId::new);
        self
    }

    /// API used to create assistants when no configured id applies
    pub fn with_api(mut self, api: Arc<dyn AssistantApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn can_create(&self) -> bool {
        self.api.is_some()
    }

    pub async fn resolve(
        &self,
        business: &BusinessConfig,
        use_demo_assistant: bool,
    ) -> SessionResult<AssistantId> {
        if use_demo_assistant {
            if let Some(id) = &self.demo_assistant_id {
                info!("Using demo assistant {}", id);
                return Ok(id.clone());
            }
        }

        if let Some(id) = &self.assistant_id {
            info!("Using configured assistant {}", id);
            return Ok(id.clone());
        }

        if let Some(api) = &self.api {
            let request = CreateAssistantRequest::for_business(business);
            info!("Creating assistant \"{}\"", request.name);
            let id = api.create_assistant(&request).await?;
            info!("Created assistant {}", id);
            return Ok(id);
        }

        Err(SessionError::Configuration(
            "no assistant available: set assistant.demo_assistant_id, assistant.assistant_id \
             or assistant.server_key"
                .to_string(),
        ))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
