use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream chat-completion provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Classification behaviour
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration, layering the given file over the embedded defaults
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: INCIDENT_CLASSIFIER__)
            .add_source(
                config::Environment::with_prefix("INCIDENT_CLASSIFIER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body, images included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Vision-capable model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// API key given directly; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// Environment variable overriding `site_url`
    #[serde(default = "default_site_url_env")]
    pub site_url_env: Option<String>,

    /// Environment variable overriding `site_name`
    #[serde(default = "default_site_name_env")]
    pub site_name_env: Option<String>,

    /// Sent as `HTTP-Referer`
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Sent as `X-Title`
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Retries after a failed attempt (at most one is honoured)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the retry (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Completion length cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ProviderConfig {
    /// Resolve the API key from the config value or the named environment variable.
    ///
    /// Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        non_blank(self.api_key.clone()).or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|name| non_blank(std::env::var(name).ok()))
        })
    }

    /// Site URL used for attribution, environment override first
    pub fn resolve_site_url(&self) -> String {
        self.site_url_env
            .as_deref()
            .and_then(|name| non_blank(std::env::var(name).ok()))
            .unwrap_or_else(|| self.site_url.clone())
    }

    /// Site name used for attribution, environment override first
    pub fn resolve_site_name(&self) -> String {
        self.site_name_env
            .as_deref()
            .and_then(|name| non_blank(std::env::var(name).ok()))
            .unwrap_or_else(|| self.site_name.clone())
    }

    /// Full chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            site_url_env: default_site_url_env(),
            site_name_env: default_site_name_env(),
            site_url: default_site_url(),
            site_name: default_site_name(),
            timeout_secs: default_provider_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// What the HTTP route answers when no provider credential is configured
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnconfiguredPolicy {
    /// 200 with the manual-entry fallback record
    #[default]
    Fallback,
    /// 503 with an error body
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Shortest base64 payload considered a plausible image
    #[serde(default = "default_min_payload_len")]
    pub min_payload_len: usize,

    /// Reject implausibly short payloads instead of forwarding them
    #[serde(default = "default_true")]
    pub strict_input: bool,

    /// Behaviour when the provider credential is absent
    #[serde(default)]
    pub unconfigured_policy: UnconfiguredPolicy,

    /// Title cap in characters
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,

    /// Description cap in characters
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min_payload_len: default_min_payload_len(),
            strict_input: default_true(),
            unconfigured_policy: UnconfiguredPolicy::default(),
            max_title_len: default_max_title_len(),
            max_description_len: default_max_description_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: default_true(),
            service_name: default_service_name(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "anthropic/claude-3-sonnet".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENROUTER_API_KEY".to_string())
}

fn default_site_url_env() -> Option<String> {
    Some("NEXT_PUBLIC_SITE_URL".to_string())
}

fn default_site_name_env() -> Option<String> {
    Some("NEXT_PUBLIC_SITE_NAME".to_string())
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_name() -> String {
    "CivicSafe".to_string()
}

fn default_provider_timeout() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.1
}

fn default_min_payload_len() -> usize {
    100
}

fn default_max_title_len() -> usize {
    100
}

fn default_max_description_len() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "incident-classifier".to_string()
}

fn default_true() -> bool {
    true
}
