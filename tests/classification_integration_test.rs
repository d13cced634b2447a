//! End-to-end classification against a mocked chat-completion endpoint

mod common;

use common::*;
use incident_classifier::classification::{
    ClassificationError, ClassificationOutcome, ClassificationRequest, ReplySource, ReportType,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_json_reply_is_normalized() {
    let mut server = mockito::Server::new_async().await;
    let reply = r#"{"title":"Robbery at Main St","reportType":"theft","description":"Two individuals seen forcing a door."}"#;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_header("x-title", "CivicSafe")
        .match_header("http-referer", "http://localhost:3000")
        .match_body(Matcher::PartialJson(json!({
            "model": "anthropic/claude-3-sonnet",
            "max_tokens": 500
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(reply))
        .expect(1)
        .create_async()
        .await;

    let classifier = classifier_for(&server.url());
    let classification = classifier.classify(&sample_data_url()).await;

    mock.assert_async().await;
    assert_eq!(classification.outcome, ClassificationOutcome::Parsed(ReplySource::Json));
    assert_eq!(classification.result.title, "Robbery at Main St");
    assert_eq!(classification.result.report_type, ReportType::Theft);
    assert_eq!(classification.result.description, "Two individuals seen forcing a door.");

    let wire = serde_json::to_value(&classification.result).unwrap();
    assert_eq!(
        wire,
        json!({
            "title": "Robbery at Main St",
            "reportType": "Theft",
            "description": "Two individuals seen forcing a door."
        })
    );
}

#[tokio::test]
async fn test_raw_payload_is_sent_as_jpeg_data_url() {
    let mut server = mockito::Server::new_async().await;
    let expected_url = format!("data:image/jpeg;base64,{}", sample_payload());
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex(regex::escape(&expected_url)))
        .with_status(200)
        .with_body(completion_body(
            r#"{"title":"Car crash","reportType":"Other","description":"Two cars collided."}"#,
        ))
        .expect(1)
        .create_async()
        .await;

    let classifier = classifier_for(&server.url());
    let classification = classifier.classify(&sample_payload()).await;

    mock.assert_async().await;
    assert_eq!(classification.result.title, "Car crash");
}

#[tokio::test]
async fn test_fenced_json_reply() {
    let mut server = mockito::Server::new_async().await;
    let reply = "```json\n{\"title\":\"Kitchen fire\",\"reportType\":\"Fire Outbreak\",\"description\":\"Flames visible through a window.\"}\n```";
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body(reply))
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert_eq!(classification.outcome, ClassificationOutcome::Parsed(ReplySource::Json));
    assert_eq!(classification.result.report_type, ReportType::FireOutbreak);
    assert_eq!(classification.result.title, "Kitchen fire");
}

#[tokio::test]
async fn test_labeled_reply() {
    let mut server = mockito::Server::new_async().await;
    let reply = "TITLE: Person collapsed on sidewalk\nTYPE: medical emergency\nDESCRIPTION: A person is lying on the ground\nwith bystanders gathered around.";
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body(reply))
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert_eq!(
        classification.outcome,
        ClassificationOutcome::Parsed(ReplySource::LabeledText)
    );
    assert_eq!(classification.result.title, "Person collapsed on sidewalk");
    assert_eq!(classification.result.report_type, ReportType::MedicalEmergency);
    assert!(classification.result.description.starts_with("A person is lying on the ground"));
    assert!(classification.result.error.is_none());
}

#[tokio::test]
async fn test_unstructured_reply_gets_generic_record() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body("I am not able to describe this picture."))
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert_eq!(
        classification.outcome,
        ClassificationOutcome::Parsed(ReplySource::Unstructured)
    );
    assert!(classification.result.title.starts_with("Incident Report - "));
    assert_eq!(classification.result.report_type, ReportType::Other);
    assert!(!classification.result.is_degraded());
}

#[tokio::test]
async fn test_unknown_report_type_is_coerced_with_warning() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body(
            r#"{"title":"Flooded road","reportType":"Flood","description":"Water covers the road."}"#,
        ))
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert_eq!(classification.result.report_type, ReportType::Other);
    let warning = classification.result.warning.expect("coercion should be reported");
    assert!(warning.contains("Flood"));
}

#[tokio::test]
async fn test_long_fields_are_truncated() {
    let mut server = mockito::Server::new_async().await;
    let reply = json!({
        "title": "T".repeat(150),
        "reportType": "Violence",
        "description": "D".repeat(800),
    })
    .to_string();
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body(&reply))
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert_eq!(classification.result.title.chars().count(), 100);
    assert_eq!(classification.result.description.chars().count(), 500);
    assert_eq!(classification.result.report_type, ReportType::Violence);
}

#[tokio::test]
async fn test_client_error_status_degrades_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"No auth credentials found"}}"#)
        .expect(1)
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    mock.assert_async().await;
    assert!(classification.result.title.starts_with("Emergency Report - "));
    assert_eq!(classification.result.report_type, ReportType::Other);
    assert!(classification.result.is_degraded());
    match classification.outcome {
        ClassificationOutcome::Degraded(ClassificationError::UpstreamStatus { status, .. }) => {
            assert_eq!(status, 401)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_retried_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("upstream overloaded")
        .expect(2)
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    mock.assert_async().await;
    assert!(classification.result.is_degraded());
}

#[tokio::test]
async fn test_silent_upstream_times_out_and_retries_once() {
    let (base_url, accepted) = silent_upstream().await;

    let classification = impatient_classifier_for(&base_url)
        .classify(&sample_data_url())
        .await;

    assert_eq!(
        classification.outcome,
        ClassificationOutcome::Degraded(ClassificationError::UpstreamTimeout(1))
    );
    assert!(classification.result.is_degraded());
    assert!(classification.result.title.starts_with("Emergency Report - "));
    assert_eq!(classification.result.report_type, ReportType::Other);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_envelope_degrades() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let classification = classifier_for(&server.url()).classify(&sample_data_url()).await;

    assert!(matches!(
        classification.outcome,
        ClassificationOutcome::Degraded(ClassificationError::UpstreamResponseMalformed(_))
    ));
    assert_eq!(classification.result.report_type, ReportType::Other);
}

#[tokio::test]
async fn test_short_payload_never_reaches_provider() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let classification = classifier_for(&server.url())
        .classify("data:image/png;base64,iVBORw0KGgo=")
        .await;

    mock.assert_async().await;
    assert!(matches!(
        classification.outcome,
        ClassificationOutcome::Degraded(ClassificationError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_missing_image_is_rejected() {
    let classifier = unconfigured_classifier();

    let err = classifier
        .classify_request(&ClassificationRequest { image: None })
        .await
        .unwrap_err();
    assert_eq!(err, ClassificationError::MissingInput);

    let err = classifier
        .classify_request(&ClassificationRequest {
            image: Some(String::new()),
        })
        .await
        .unwrap_err();
    assert_eq!(err, ClassificationError::MissingInput);
}

#[tokio::test]
async fn test_same_reply_gives_same_record() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body(
            r#"{"title":"Fight outside bar","reportType":"violence","description":"Several people fighting."}"#,
        ))
        .expect(2)
        .create_async()
        .await;

    let classifier = classifier_for(&server.url());
    let first = classifier.classify(&sample_data_url()).await;
    let second = classifier.classify(&sample_data_url()).await;

    assert_eq!(first, second);
}
