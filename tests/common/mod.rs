//! Shared fixtures for the integration tests

#![allow(dead_code)]

use incident_classifier::classification::{
    ClassifierSettings, IncidentClassifier, OpenRouterProvider,
};
use incident_classifier::config::ProviderConfig;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "test-key";

/// JPEG-looking base64 payload comfortably above the plausibility threshold
pub fn sample_payload() -> String {
    format!("/9j/4AAQSkZJRgABAQAAAQABAAD{}", "A".repeat(200))
}

pub fn sample_data_url() -> String {
    format!("data:image/jpeg;base64,{}", sample_payload())
}

/// Chat-completion envelope carrying `content` as the first choice
pub fn completion_body(content: &str) -> String {
    json!({
        "id": "gen-test",
        "model": "anthropic/claude-3-sonnet",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
    .to_string()
}

/// Provider config aimed at a mock server, isolated from process env vars
pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        api_key_env: None,
        site_url_env: None,
        site_name_env: None,
        timeout_secs: 5,
        ..ProviderConfig::default()
    }
}

/// Settings with a negligible retry delay
pub fn fast_settings() -> ClassifierSettings {
    ClassifierSettings {
        retry_backoff: Duration::from_millis(1),
        ..ClassifierSettings::default()
    }
}

/// Classifier talking to `base_url` through the real HTTP provider
pub fn classifier_for(base_url: &str) -> IncidentClassifier {
    let provider = OpenRouterProvider::new(&provider_config(base_url), TEST_API_KEY.to_string())
        .expect("provider should build");
    IncidentClassifier::new(Some(Arc::new(provider)), fast_settings())
}

/// Classifier with a one-second provider timeout
pub fn impatient_classifier_for(base_url: &str) -> IncidentClassifier {
    let config = ProviderConfig {
        timeout_secs: 1,
        ..provider_config(base_url)
    };
    let provider = OpenRouterProvider::new(&config, TEST_API_KEY.to_string())
        .expect("provider should build");
    IncidentClassifier::new(Some(Arc::new(provider)), fast_settings())
}

/// Upstream that accepts connections and never answers.
///
/// Returns its base URL and a count of accepted connections.
pub async fn silent_upstream() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("listener address");
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            open.push(socket);
        }
    });

    (format!("http://{}", addr), accepted)
}

/// Classifier without a credential
pub fn unconfigured_classifier() -> IncidentClassifier {
    IncidentClassifier::new(None, fast_settings())
}

/// Group Prometheus exposition lines by metric family
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                current_metric = parts[2].to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
