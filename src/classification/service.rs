use crate::classification::error::{ClassificationError, ClassifyResult};
use crate::classification::input::ImagePayload;
use crate::classification::models::{ClassificationRequest, ClassificationResult};
use crate::classification::observer::{ClassificationObserver, RequestContext, TracingObserver};
use crate::classification::parser::{parse_reply, OutputLimits, ReplySource};
use crate::classification::prompt::build_prompt;
use crate::classification::provider::{
    ChatCompletionProvider, ChatCompletionRequest, OpenRouterProvider,
};
use crate::config::{ClassificationConfig, Config, ProviderConfig};
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

/// Provider-independent settings of the classifier
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Retries after a failed attempt; clamped to one
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub min_payload_len: usize,
    pub strict_input: bool,
    pub limits: OutputLimits,
}

impl ClassifierSettings {
    pub fn from_config(provider: &ProviderConfig, classification: &ClassificationConfig) -> Self {
        Self {
            model: provider.model.clone(),
            max_tokens: provider.max_tokens,
            temperature: provider.temperature,
            max_retries: provider.max_retries.min(1),
            retry_backoff: Duration::from_millis(provider.retry_backoff_ms),
            min_payload_len: classification.min_payload_len,
            strict_input: classification.strict_input,
            limits: OutputLimits {
                max_title_len: classification.max_title_len,
                max_description_len: classification.max_description_len,
            },
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default(), &ClassificationConfig::default())
    }
}

/// How a classification was reached
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    /// Record derived from the model reply
    Parsed(ReplySource),
    /// No credential; fixed manual-entry record
    NotConfigured,
    /// Something failed; degraded record
    Degraded(ClassificationError),
}

/// A record together with how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub result: ClassificationResult,
    pub outcome: ClassificationOutcome,
}

/// Classifies incident images through a chat-completion provider.
///
/// Stateless apart from immutable settings; share it behind an `Arc`.
pub struct IncidentClassifier {
    provider: Option<Arc<dyn ChatCompletionProvider>>,
    settings: ClassifierSettings,
    prompt: String,
    observer: Arc<dyn ClassificationObserver>,
}

impl IncidentClassifier {
    /// Create a classifier; `provider` is `None` when no credential is configured
    pub fn new(provider: Option<Arc<dyn ChatCompletionProvider>>, settings: ClassifierSettings) -> Self {
        Self {
            provider,
            settings,
            prompt: build_prompt(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Build from application config, resolving the API key
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = ClassifierSettings::from_config(&config.provider, &config.classification);

        let provider: Option<Arc<dyn ChatCompletionProvider>> = match config.provider.resolve_api_key() {
            Some(api_key) => {
                let provider = OpenRouterProvider::new(&config.provider, api_key)?;
                info!(
                    provider = provider.name(),
                    endpoint = provider.endpoint(),
                    model = %config.provider.model,
                    "Image analysis provider configured"
                );
                Some(Arc::new(provider))
            }
            None => {
                info!("No provider API key found; image analysis will return fallback records");
                None
            }
        };

        Ok(Self::new(provider, settings))
    }

    /// Replace the observability sink
    pub fn with_observer(mut self, observer: Arc<dyn ClassificationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Whether a provider credential is available
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Classify a request body; `MissingInput` is the only error
    pub async fn classify_request(&self, request: &ClassificationRequest) -> ClassifyResult<Classification> {
        let image = request
            .image
            .as_deref()
            .filter(|image| !image.is_empty())
            .ok_or(ClassificationError::MissingInput)?;

        Ok(self.classify(image).await)
    }

    /// Classify an image string. Never fails; failures yield a degraded record.
    pub async fn classify(&self, image: &str) -> Classification {
        let mut ctx = RequestContext::new(image.len());

        let Some(provider) = self.provider.as_ref() else {
            self.observer.on_not_configured(&ctx);
            return Classification {
                result: ClassificationResult::not_configured(),
                outcome: ClassificationOutcome::NotConfigured,
            };
        };

        match self.run(provider.as_ref(), image, &mut ctx).await {
            Ok((result, source)) => {
                self.observer.on_classified(&ctx, &result, source);
                Classification {
                    result,
                    outcome: ClassificationOutcome::Parsed(source),
                }
            }
            Err(error) => {
                self.observer.on_degraded(&ctx, &error);
                Classification {
                    result: ClassificationResult::degraded(error.to_string()),
                    outcome: ClassificationOutcome::Degraded(error),
                }
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn ChatCompletionProvider,
        image: &str,
        ctx: &mut RequestContext,
    ) -> ClassifyResult<(ClassificationResult, ReplySource)> {
        let payload = ImagePayload::extract(image)?;
        ctx.fingerprint = Some(payload.fingerprint());

        if let Err(error) = payload.ensure_plausible(self.settings.min_payload_len) {
            if self.settings.strict_input || payload.is_empty() {
                return Err(error);
            }
            self.observer.on_input_tolerated(ctx, &error);
        }

        let request = ChatCompletionRequest::vision(
            self.settings.model.clone(),
            self.prompt.clone(),
            payload.to_jpeg_data_url(),
            self.settings.max_tokens,
            self.settings.temperature,
        );

        debug!(
            request_id = %ctx.request_id,
            provider = provider.name(),
            model = %self.settings.model,
            payload_len = payload.as_str().len(),
            "Requesting image classification"
        );
        let content = self.complete_with_retry(provider, &request, ctx).await?;

        let reply = parse_reply(&content, &self.settings.limits, Utc::now().date_naive());
        if reply.source == ReplySource::Unstructured {
            self.observer.on_parse_failure(
                ctx,
                &ClassificationError::ParseFailure(
                    "no JSON object or labeled fields in reply".to_string(),
                ),
            );
        }

        Ok((reply.result, reply.source))
    }

    async fn complete_with_retry(
        &self,
        provider: &dyn ChatCompletionProvider,
        request: &ChatCompletionRequest,
        ctx: &RequestContext,
    ) -> ClassifyResult<String> {
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result = provider.complete(request).await;
            self.observer.on_provider_attempt(
                ctx,
                attempt + 1,
                started.elapsed(),
                result.as_ref().map(|_| ()),
            );

            match result {
                Ok(content) => return Ok(content),
                Err(error) if attempt < self.settings.max_retries && error.is_retryable() => {
                    // Exponential backoff
                    let delay = self.settings.retry_backoff * 2_u32.pow(attempt);
                    self.observer.on_retry(ctx, attempt + 1, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
