//! Critique orchestration: one session, one outstanding request.
//!
//! The orchestrator owns the session state and is its only writer. Selecting
//! an image publishes the preview, then `Loading`, then spawns a task that
//! runs compact encoding, prompt building and the provider call. A newer
//! selection cancels the stale task, and a stale task never writes state.

use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog;
use crate::config::{Config, CritiqueConfig, LlmConfig};
use crate::error::CritiqueError;
use crate::llm::{CritiqueRequest, ProviderFactory};
use crate::pipeline::ImageNormalizer;
use crate::prompt::PromptBuilder;
use crate::session::{Phase, SessionPublisher, SessionState};
use crate::types::{CritiqueResult, CritiqueStyle, Language, Provider};

/// What the next selection will be critiqued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueSettings {
    pub provider: Provider,
    pub model: String,
    pub style: CritiqueStyle,
    pub language: Language,
}

impl CritiqueSettings {
    /// Settings from the `[critique]` config section. An unlisted model
    /// falls back to the provider's first model.
    pub fn from_config(config: &CritiqueConfig) -> Self {
        Self {
            provider: config.provider,
            model: catalog::resolve(config.provider, &config.model).to_string(),
            style: config.style,
            language: config.language,
        }
    }

    /// Switch provider, keeping the model only if the new provider lists it.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.model = catalog::resolve(provider, &self.model).to_string();
        self.provider = provider;
        self
    }

    /// Pick a model of the current provider.
    pub fn with_model(mut self, model: &str) -> Result<Self, CritiqueError> {
        if !catalog::contains(self.provider, model) {
            return Err(CritiqueError::UnknownModel {
                provider: self.provider,
                model: model.to_string(),
            });
        }
        self.model = model.to_string();
        Ok(self)
    }

    pub fn with_style(mut self, style: CritiqueStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

impl Default for CritiqueSettings {
    fn default() -> Self {
        Self::from_config(&CritiqueConfig::default())
    }
}

/// Handle to the task spawned by [`CritiqueOrchestrator::select_image`].
///
/// Dropping the handle detaches the task; it still publishes its outcome.
#[derive(Debug)]
pub struct CritiqueTask {
    handle: Option<JoinHandle<()>>,
    token: CancellationToken,
}

impl CritiqueTask {
    fn finished(token: CancellationToken) -> Self {
        Self {
            handle: None,
            token,
        }
    }

    /// Cancel the request. The session moves to `Failed` unless a newer
    /// selection already superseded it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait until the task has published its terminal state (or given up
    /// because it was superseded).
    pub async fn wait(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = handle.await {
                tracing::error!("Critique task panicked: {e}");
            }
        }
    }
}

/// Coordinates normalizer, prompt builder and provider adapter for one
/// analysis session.
pub struct CritiqueOrchestrator {
    config: Config,
    settings: CritiqueSettings,
    normalizer: ImageNormalizer,
    publisher: Arc<SessionPublisher>,
    in_flight: Option<CancellationToken>,
}

impl CritiqueOrchestrator {
    pub fn new(config: Config, settings: CritiqueSettings) -> Self {
        let normalizer = ImageNormalizer::new(config.image.clone(), config.limits.clone());
        Self {
            config,
            settings,
            normalizer,
            publisher: SessionPublisher::new(),
            in_flight: None,
        }
    }

    /// Orchestrator using the settings from `config.critique`.
    pub fn from_config(config: Config) -> Self {
        let settings = CritiqueSettings::from_config(&config.critique);
        Self::new(config, settings)
    }

    pub fn settings(&self) -> &CritiqueSettings {
        &self.settings
    }

    /// Replace the settings used for the next selection.
    ///
    /// Rejected while a request is in flight, or when the model is not
    /// listed for the provider.
    pub fn update_settings(&mut self, settings: CritiqueSettings) -> Result<(), CritiqueError> {
        let phase = self.publisher.phase();
        if phase == Phase::Loading {
            return Err(CritiqueError::InvalidTransition {
                phase: phase.as_str(),
                action: "change settings",
            });
        }
        if !catalog::contains(settings.provider, &settings.model) {
            return Err(CritiqueError::UnknownModel {
                provider: settings.provider,
                model: settings.model,
            });
        }
        tracing::debug!(
            "Settings: {} / {} / {} / {:?}",
            settings.provider,
            settings.model,
            settings.style,
            settings.language
        );
        self.settings = settings;
        Ok(())
    }

    /// Read-only view of the session that always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.publisher.subscribe()
    }

    /// Every phase change, in order.
    pub fn transitions(&self) -> broadcast::Receiver<Phase> {
        self.publisher.transitions()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.publisher.snapshot()
    }

    /// Start a critique of `bytes`.
    ///
    /// Returns once the preview is published and `Loading` is entered (or
    /// the image failed to decode). Only a reset leaves `Succeeded` and
    /// `Failed`, so selecting from those fails with an invalid transition.
    pub async fn select_image(&mut self, bytes: Vec<u8>) -> Result<CritiqueTask, CritiqueError> {
        let (generation, phase) =
            self.publisher
                .begin_selection()
                .map_err(|phase| CritiqueError::InvalidTransition {
                    phase: phase.as_str(),
                    action: "select an image",
                })?;
        if let Some(stale) = self.in_flight.take() {
            if phase == Phase::Loading {
                tracing::warn!("Superseding in-flight critique");
            }
            stale.cancel();
        }
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let image = match self.normalizer.decode(bytes).await {
            Ok(decoded) => Arc::new(decoded.image),
            Err(e) => return Ok(self.fail_without_preview(e, token)),
        };
        let preview = match self.normalizer.preview(Arc::clone(&image)).await {
            Ok(preview) => Arc::new(preview),
            Err(e) => return Ok(self.fail_without_preview(e, token)),
        };

        self.publisher.publish(SessionState::PreviewReady {
            preview: Arc::clone(&preview),
        });
        self.publisher.publish(SessionState::Loading {
            preview: Arc::clone(&preview),
        });

        let job = CritiqueJob {
            normalizer: self.normalizer.clone(),
            settings: self.settings.clone(),
            llm: self.config.llm.clone(),
        };
        let publisher = Arc::clone(&self.publisher);
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancelled.cancelled() => Err(CritiqueError::Cancelled),
                outcome = job.run(image) => outcome,
            };

            let state = match outcome {
                Ok(result) => SessionState::Succeeded { preview, result },
                Err(e) => {
                    tracing::warn!("Critique failed: {e}");
                    SessionState::Failed {
                        preview: Some(preview),
                        message: e.to_string(),
                    }
                }
            };
            if !publisher.publish_if_current(generation, state) {
                tracing::debug!("Dropping outcome of superseded critique");
            }
        });

        Ok(CritiqueTask {
            handle: Some(handle),
            token,
        })
    }

    /// Return to `Idle` from `Succeeded` or `Failed`, clearing preview,
    /// result and error. Ignored in any other phase.
    pub fn reset(&mut self) -> bool {
        let phase = self.publisher.phase();
        if !phase.is_terminal() {
            tracing::debug!("Ignoring reset while {phase}");
            return false;
        }
        self.publisher.next_generation();
        self.in_flight = None;
        self.publisher.publish(SessionState::Idle);
        true
    }

    fn fail_without_preview(
        &mut self,
        error: CritiqueError,
        token: CancellationToken,
    ) -> CritiqueTask {
        tracing::warn!("Could not prepare image: {error}");
        self.in_flight = None;
        self.publisher.publish(SessionState::Failed {
            preview: None,
            message: error.to_string(),
        });
        CritiqueTask::finished(token)
    }
}

impl Drop for CritiqueOrchestrator {
    fn drop(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

/// Everything the spawned task needs, detached from the orchestrator.
struct CritiqueJob {
    normalizer: ImageNormalizer,
    settings: CritiqueSettings,
    llm: LlmConfig,
}

impl CritiqueJob {
    async fn run(self, image: Arc<DynamicImage>) -> Result<CritiqueResult, CritiqueError> {
        let compact = self.normalizer.compact(image).await?;
        let prompt = PromptBuilder::new(self.settings.language).build_prompt(self.settings.style);
        let provider =
            ProviderFactory::create(self.settings.provider, &self.settings.model, &self.llm)?;

        let request = CritiqueRequest {
            image: compact.image,
            prompt,
            provider: self.settings.provider,
            model: self.settings.model.clone(),
            max_tokens: self.llm.max_tokens,
        };

        tracing::debug!(
            "Requesting {} critique from {} ({}, {}x{})",
            self.settings.style,
            self.settings.provider,
            self.settings.model,
            compact.width,
            compact.height
        );
        let start = Instant::now();

        let result = match self.llm.timeout_secs {
            Some(secs) => tokio::time::timeout(
                Duration::from_secs(secs),
                provider.submit_critique(&request),
            )
            .await
            .map_err(|_| CritiqueError::Timeout {
                provider: self.settings.provider,
                secs,
            })?,
            None => provider.submit_critique(&request).await,
        }?;

        tracing::info!(
            "{} scored {:.0} in {:.1}s",
            self.settings.provider,
            result.overall_score,
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use image::{GenericImageView, ImageFormat};
    use serde_json::json;
    use std::io::Cursor;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const CRITIQUE: &str = r#"{"title":"Quiet Harbor","overallScore":78,"summary":"Calm and balanced.","strengths":["soft light"],"improvements":["lower the horizon"]}"#;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn gemini_reply(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    fn config_for(server: &MockServer, api_key: &str) -> Config {
        let mut config = Config::default();
        config.llm.api_key = api_key.to_string();
        config.llm.google.endpoint = Some(server.uri());
        config.llm.openai.endpoint = Some(server.uri());
        config.llm.anthropic.endpoint = Some(server.uri());
        config
    }

    fn expected_critique() -> CritiqueResult {
        serde_json::from_str(CRITIQUE).unwrap()
    }

    fn drain(transitions: &mut broadcast::Receiver<Phase>) -> Vec<Phase> {
        std::iter::from_fn(|| transitions.try_recv().ok()).collect()
    }

    /// Replies with the compact image's dimensions as the title; larger
    /// images are answered slowly.
    struct EchoDimensions;

    impl Respond for EchoDimensions {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let data = body["contents"][0]["parts"][0]["inlineData"]["data"]
                .as_str()
                .unwrap();
            let jpeg = BASE64.decode(data).unwrap();
            let (width, height) = image::load_from_memory(&jpeg).unwrap().dimensions();

            let critique = json!({
                "title": format!("{width}x{height}"),
                "overallScore": 50,
                "summary": "S",
                "strengths": ["a"],
                "improvements": ["b"]
            });
            let delay = if width > 32 { 500 } else { 0 };
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply(&critique.to_string()))
                .set_delay(Duration::from_millis(delay))
        }
    }

    #[test]
    fn test_switching_provider_resolves_first_model() {
        let settings = CritiqueSettings::default();
        assert_eq!(settings.provider, Provider::Google);
        assert_eq!(settings.model, "gemini-2.5-flash");

        let settings = settings.with_provider(Provider::Anthropic);
        assert_eq!(settings.model, "claude-3-5-sonnet-20241022");

        let settings = settings.with_model("claude-3-haiku-20240307").unwrap();
        assert_eq!(settings.model, "claude-3-haiku-20240307");

        let err = settings.with_model("gpt-4o").unwrap_err();
        assert!(matches!(err, CritiqueError::UnknownModel { .. }));
    }

    #[test]
    fn test_update_settings_rejects_foreign_model() {
        let mut orchestrator = CritiqueOrchestrator::from_config(Config::default());
        let settings = CritiqueSettings {
            provider: Provider::OpenAi,
            model: "gemini-2.5-flash".to_string(),
            ..CritiqueSettings::default()
        };
        assert!(matches!(
            orchestrator.update_settings(settings),
            Err(CritiqueError::UnknownModel { .. })
        ));
        assert_eq!(orchestrator.settings().provider, Provider::Google);
    }

    #[tokio::test]
    async fn test_successful_critique() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(body_string_contains(crate::prompt::emphasis(
                Language::Chinese,
                CritiqueStyle::Balanced,
            )))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply(CRITIQUE))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        let mut transitions = orchestrator.transitions();

        let task = orchestrator.select_image(png(4000, 3000)).await.unwrap();
        let loading = orchestrator.state();
        assert_eq!(loading.phase(), Phase::Loading);
        let preview = loading.preview().unwrap();
        assert_eq!((preview.width, preview.height), (4000, 3000));

        task.wait().await;
        let state = orchestrator.state();
        assert_eq!(state.result(), Some(&expected_critique()));
        assert!(state.error().is_none());
        assert!(state.preview().is_some());
        assert_eq!(
            drain(&mut transitions),
            vec![Phase::PreviewReady, Phase::Loading, Phase::Succeeded]
        );

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let data = body["contents"][0]["parts"][0]["inlineData"]["data"]
            .as_str()
            .unwrap();
        let compact = image::load_from_memory(&BASE64.decode(data).unwrap()).unwrap();
        assert_eq!(compact.dimensions(), (1536, 1152));
    }

    #[tokio::test]
    async fn test_unauthorized_fails_with_reason_and_keeps_preview() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": 401, "message": "API key not valid", "status": "UNAUTHENTICATED" }
            })))
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "bad-key"));
        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;

        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Failed);
        assert!(state.error().unwrap().contains("API key not valid"));
        assert!(state.result().is_none());
        assert_eq!(state.preview().map(|p| p.width), Some(64));
    }

    #[tokio::test]
    async fn test_fenced_anthropic_reply_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": format!("```json\n{CRITIQUE}\n```") }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server, "test-key");
        let settings = CritiqueSettings::from_config(&config.critique)
            .with_provider(Provider::Anthropic)
            .with_style(CritiqueStyle::Technical);
        let mut orchestrator = CritiqueOrchestrator::new(config, settings);

        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;
        assert_eq!(orchestrator.state().result(), Some(&expected_critique()));
    }

    #[tokio::test]
    async fn test_missing_credential_never_reaches_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(CRITIQUE)))
            .expect(0)
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(
            &server,
            "${LENSCRITIC_TEST_UNSET_KEY}",
        ));
        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;

        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Failed);
        assert!(state.error().unwrap().contains("API key is missing"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_from_failed_clears_preview() {
        let server = MockServer::start().await;
        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(
            &server,
            "${LENSCRITIC_TEST_UNSET_KEY}",
        ));
        let mut transitions = orchestrator.transitions();
        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;

        let failed = orchestrator.state();
        assert_eq!(failed.phase(), Phase::Failed);
        assert!(failed.preview().is_some());
        assert!(failed.error().is_some());

        assert!(orchestrator.reset());
        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.preview().is_none());
        assert!(state.error().is_none());
        assert!(state.result().is_none());
        assert_eq!(drain(&mut transitions).last(), Some(&Phase::Idle));

        // The session accepts a new selection again.
        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;
        assert_eq!(orchestrator.state().phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn test_new_selection_supersedes_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(EchoDimensions)
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        let mut transitions = orchestrator.transitions();

        let first = orchestrator.select_image(png(64, 64)).await.unwrap();
        assert_eq!(orchestrator.state().phase(), Phase::Loading);
        let second = orchestrator.select_image(png(32, 32)).await.unwrap();

        second.wait().await;
        first.wait().await;

        let state = orchestrator.state();
        assert_eq!(state.result().map(|r| r.title.as_str()), Some("32x32"));
        assert_eq!(state.preview().map(|p| p.width), Some(32));
        assert_eq!(
            drain(&mut transitions),
            vec![
                Phase::PreviewReady,
                Phase::Loading,
                Phase::PreviewReady,
                Phase::Loading,
                Phase::Succeeded
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_fails_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply(CRITIQUE))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        let task = orchestrator.select_image(png(64, 48)).await.unwrap();
        task.cancel();
        task.wait().await;

        let state = orchestrator.state();
        assert_eq!(state.error(), Some("Request cancelled"));
    }

    #[tokio::test]
    async fn test_timeout_fails_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply(CRITIQUE))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut config = config_for(&server, "test-key");
        config.llm.timeout_secs = Some(1);
        let mut orchestrator = CritiqueOrchestrator::from_config(config);
        orchestrator.select_image(png(64, 48)).await.unwrap().wait().await;

        assert_eq!(
            orchestrator.state().error(),
            Some("Google did not respond within 1s")
        );
    }

    #[tokio::test]
    async fn test_undecodable_image_fails_without_preview() {
        let mut orchestrator = CritiqueOrchestrator::from_config(Config::default());
        let mut transitions = orchestrator.transitions();

        let task = orchestrator.select_image(b"not an image".to_vec()).await.unwrap();
        assert!(task.is_finished());

        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Failed);
        assert!(state.preview().is_none());
        assert!(state.error().unwrap().starts_with("Could not decode image"));
        assert_eq!(drain(&mut transitions), vec![Phase::Failed]);
    }

    #[tokio::test]
    async fn test_terminal_states_require_reset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(CRITIQUE)))
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        assert!(!orchestrator.reset());

        orchestrator.select_image(png(16, 16)).await.unwrap().wait().await;
        assert_eq!(orchestrator.state().phase(), Phase::Succeeded);

        let err = orchestrator.select_image(png(16, 16)).await.unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidTransition { .. }));

        assert!(orchestrator.reset());
        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.preview().is_none());
        assert!(state.result().is_none());

        orchestrator.select_image(png(16, 16)).await.unwrap().wait().await;
        assert_eq!(orchestrator.state().phase(), Phase::Succeeded);
    }

    #[tokio::test]
    async fn test_settings_locked_while_loading() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply(CRITIQUE))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        let task = orchestrator.select_image(png(16, 16)).await.unwrap();

        let changed = orchestrator.settings().clone().with_style(CritiqueStyle::Social);
        assert!(matches!(
            orchestrator.update_settings(changed.clone()),
            Err(CritiqueError::InvalidTransition { .. })
        ));

        task.wait().await;
        orchestrator.update_settings(changed).unwrap();
        assert_eq!(orchestrator.settings().style, CritiqueStyle::Social);
    }

    #[tokio::test]
    async fn test_subscriber_sees_final_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(CRITIQUE)))
            .mount(&server)
            .await;

        let mut orchestrator = CritiqueOrchestrator::from_config(config_for(&server, "test-key"));
        let mut receiver = orchestrator.subscribe();
        let _task = orchestrator.select_image(png(16, 16)).await.unwrap();

        let state = receiver
            .wait_for(|state| state.phase().is_terminal())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.result(), Some(&expected_critique()));
    }
}
