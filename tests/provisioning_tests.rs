// Tests for assistant resolution
//
// The fallback order is demo id (when asked), general id, then dynamic
// creation; with none of them available provisioning is a configuration
// error.

mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use common::business;
use frontdesk_voice::provisioning::{AssistantApi, AssistantProvisioner, CreateAssistantRequest};
use frontdesk_voice::{AssistantId, SessionError, SessionResult};

#[derive(Default)]
struct FakeApi {
    requests: Mutex<Vec<CreateAssistantRequest>>,
    fail: bool,
}

#[async_trait::async_trait]
impl AssistantApi for FakeApi {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> SessionResult<AssistantId> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(SessionError::Provisioning("failed to create assistant: HTTP 500".into()));
        }
        Ok(AssistantId::new("asst-created"))
    }
}

#[tokio::test]
async fn test_demo_id_used_when_requested() -> Result<()> {
    let provisioner = AssistantProvisioner::new().with_demo_assistant_id(Some("asst-demo".into()));

    let id = provisioner.resolve(&business(), true).await?;
    assert_eq!(id.as_str(), "asst-demo");

    Ok(())
}

#[tokio::test]
async fn test_demo_id_ignored_without_flag() -> Result<()> {
    let provisioner = AssistantProvisioner::new().with_demo_assistant_id(Some("asst-demo".into()));

    let err = provisioner.resolve(&business(), false).await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));

    Ok(())
}

#[tokio::test]
async fn test_general_id_used_regardless_of_demo_flag() -> Result<()> {
    let provisioner = AssistantProvisioner::new().with_assistant_id(Some("asst-general".into()));

    assert_eq!(provisioner.resolve(&business(), false).await?.as_str(), "asst-general");
    assert_eq!(provisioner.resolve(&business(), true).await?.as_str(), "asst-general");

    Ok(())
}

#[tokio::test]
async fn test_demo_beats_general_when_requested() -> Result<()> {
    let provisioner = AssistantProvisioner::new()
        .with_assistant_id(Some("asst-general".into()))
        .with_demo_assistant_id(Some("asst-demo".into()));

    assert_eq!(provisioner.resolve(&business(), true).await?.as_str(), "asst-demo");
    assert_eq!(provisioner.resolve(&business(), false).await?.as_str(), "asst-general");

    Ok(())
}

#[tokio::test]
async fn test_creates_assistant_when_no_id_configured() -> Result<()> {
    let api = Arc::new(FakeApi::default());
    let provisioner = AssistantProvisioner::new().with_api(api.clone());

    let id = provisioner.resolve(&business(), false).await?;
    assert_eq!(id.as_str(), "asst-created");

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, "Sunrise Dental - Healthcare");
    assert_eq!(requests[0].voice.voice_id, "EXAVITQu4vr4xnSDxMaL");
    assert!((requests[0].model.temperature - 0.8).abs() < f32::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_configured_id_skips_creation() -> Result<()> {
    let api = Arc::new(FakeApi::default());
    let provisioner = AssistantProvisioner::new()
        .with_assistant_id(Some("asst-general".into()))
        .with_api(api.clone());

    provisioner.resolve(&business(), false).await?;
    assert!(api.requests.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_creation_failure_is_provisioning_error() -> Result<()> {
    let api = Arc::new(FakeApi {
        fail: true,
        ..FakeApi::default()
    });
    let provisioner = AssistantProvisioner::new().with_api(api);

    let err = provisioner.resolve(&business(), false).await.unwrap_err();
    assert!(matches!(err, SessionError::Provisioning(_)));

    Ok(())
}

#[tokio::test]
async fn test_nothing_configured_names_missing_settings() -> Result<()> {
    let err = AssistantProvisioner::new()
        .resolve(&business(), true)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("CONFIGURATION_ERROR"));
    assert!(message.contains("assistant.demo_assistant_id"));
    assert!(message.contains("assistant.assistant_id"));
    assert!(message.contains("assistant.server_key"));

    Ok(())
}
