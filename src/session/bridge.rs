use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::config::{SessionBackend, SessionConfig};
use super::session::{ActiveResources, ActivityChannels, SessionHandle};
use crate::audio::{
    AudioBackendFactory, CaptureBackend, DeviceBackendFactory, MixerConfig, PlaybackMixer,
    PlaybackQueue,
};
use crate::business::BusinessConfig;
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::provisioning::{AssistantProvisioner, HttpAssistantApi};
use crate::transport::{Connector, LiveConfig, SessionListener, SessionTarget, WebSocketConnector};

/// Per-call options supplied by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StartOptions {
    /// Prefer the demo assistant when one is configured
    #[serde(default)]
    pub use_demo_assistant: bool,
}

/// Entry point for starting calls
///
/// Holds the long-lived collaborators (connector, audio devices, assistant
/// provisioning); every call gets its own `SessionHandle`.
pub struct SessionBridge {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    audio: Arc<dyn AudioBackendFactory>,
    provisioner: AssistantProvisioner,
}

impl SessionBridge {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        audio: Arc<dyn AudioBackendFactory>,
        provisioner: AssistantProvisioner,
    ) -> Self {
        Self {
            config,
            connector,
            audio,
            provisioner,
        }
    }

    /// Bridge wired to the websocket endpoint, host audio devices and HTTP provisioning
    pub fn from_config(cfg: &Config) -> Self {
        let connector = WebSocketConnector::new(cfg.live.endpoint.clone(), cfg.live.api_key.clone())
            .with_connect_timeout(Duration::from_millis(cfg.live.connect_timeout_ms))
            .with_outbound_queue_depth(cfg.session.outbound_queue_depth);

        let mut provisioner = AssistantProvisioner::new()
            .with_assistant_id(cfg.assistant.assistant_id.clone())
            .with_demo_assistant_id(cfg.assistant.demo_assistant_id.clone());

        if let Some(server_key) = cfg
            .assistant
            .server_key
            .clone()
            .filter(|key| !key.trim().is_empty())
        {
            provisioner = provisioner.with_api(Arc::new(HttpAssistantApi::new(
                cfg.assistant.api_base.clone(),
                server_key,
            )));
        }

        Self::new(
            SessionConfig::from(cfg),
            Arc::new(connector),
            Arc::new(DeviceBackendFactory),
            provisioner,
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provisioner(&self) -> &AssistantProvisioner {
        &self.provisioner
    }

    /// A fresh, idle handle with its own empty transcript
    pub fn new_session(&self, listener: Arc<dyn SessionListener>) -> SessionHandle {
        SessionHandle::new(listener)
    }

    /// Create a handle and start it
    pub async fn start_session(
        &self,
        business: &BusinessConfig,
        options: StartOptions,
        listener: Arc<dyn SessionListener>,
    ) -> SessionResult<SessionHandle> {
        let handle = self.new_session(listener);
        self.start(&handle, business, options).await?;
        Ok(handle)
    }

    /// Start a call on an idle handle
    ///
    /// Order: microphone probe, target resolution, connect, speakers,
    /// microphone. A failure at any step releases what was already acquired
    /// and leaves the handle closed.
    pub async fn start(
        &self,
        handle: &SessionHandle,
        business: &BusinessConfig,
        options: StartOptions,
    ) -> SessionResult<()> {
        info!(
            "Starting session {} for {} ({:?} backend)",
            handle.id(),
            business.name,
            self.config.backend
        );

        handle
            .start_with(self.establish(handle, business, options))
            .await
    }

    /// Decide what the connection should talk to
    pub async fn resolve_target(
        &self,
        business: &BusinessConfig,
        options: StartOptions,
    ) -> SessionResult<SessionTarget> {
        // Both backends authenticate against the same endpoint
        if self.config.live_api_key.is_none() {
            return Err(SessionError::Configuration(
                "live.api_key is not set".to_string(),
            ));
        }

        match self.config.backend {
            SessionBackend::Assistant => {
                let id = self
                    .provisioner
                    .resolve(business, options.use_demo_assistant)
                    .await?;
                Ok(SessionTarget::Assistant(id))
            }
            SessionBackend::Live => Ok(SessionTarget::Live(LiveConfig {
                model: self.config.live_model.clone(),
                system_instruction: business.system_prompt(),
                voice_name: business.voice.prebuilt_name().to_string(),
            })),
        }
    }

    async fn establish(
        &self,
        handle: &SessionHandle,
        business: &BusinessConfig,
        options: StartOptions,
    ) -> SessionResult<(ActiveResources, ActivityChannels)> {
        let mut acquired = ActiveResources::default();

        match self.acquire(handle, business, options, &mut acquired).await {
            Ok(channels) => Ok((acquired, channels)),
            Err(e) => {
                acquired.release().await;
                Err(e)
            }
        }
    }

    async fn acquire(
        &self,
        handle: &SessionHandle,
        business: &BusinessConfig,
        options: StartOptions,
        acquired: &mut ActiveResources,
    ) -> SessionResult<ActivityChannels> {
        let audio_config = &self.config.audio;

        // Nothing remote happens until the microphone is known to be usable
        let mut capture = self.audio.capture(audio_config)?;
        probe_microphone(capture.as_mut()).await?;
        handle.ensure_not_cancelled()?;

        let target = handle
            .until_cancelled(self.resolve_target(business, options))
            .await?;

        let link = handle
            .until_cancelled(self.connector.connect(&target))
            .await?;
        let (outbound, inbound, closer) = link.into_parts();
        acquired.closer = Some(closer);
        handle.ensure_not_cancelled()?;

        let mut output = self.audio.output(audio_config)?;
        let (mixer, completions) = PlaybackMixer::new(MixerConfig {
            sample_rate: output.sample_rate(),
        });
        let mixer = Arc::new(mixer);
        output.start(Arc::clone(&mixer)).await?;
        acquired.output = Some(output);

        let queue = Arc::new(PlaybackQueue::new(mixer));
        acquired.queue = Some(Arc::clone(&queue));

        let frames = capture.start().await?;
        acquired.capture = Some(capture);
        handle.ensure_not_cancelled()?;

        Ok(ActivityChannels {
            frames,
            outbound,
            inbound,
            completions,
            queue,
            inbound_channels: self.config.inbound_channels,
        })
    }
}

/// Open and immediately release the microphone
async fn probe_microphone(capture: &mut dyn CaptureBackend) -> SessionResult<()> {
    let frames = capture.start().await?;
    drop(frames);
    capture.stop().await
}
