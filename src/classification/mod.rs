//! Incident image classification.
//!
//! Turns a submitted image into a `{title, reportType, description}` record:
//!
//! - **Input**: data-URL or raw base64, reduced to a bare payload
//! - **Provider**: one vision chat-completion call, bounded by a timeout and
//!   retried at most once on transient failures
//! - **Parser**: strict JSON first, labeled lines second, generic text last
//! - **Normalization**: closed report type set, length caps
//!
//! Classification is an enrichment step for the report form, so every
//! failure after input validation yields a degraded but well-formed record.

pub mod error;
pub mod input;
pub mod models;
pub mod observer;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod service;

pub use error::{ClassificationError, ClassifyResult};
pub use input::ImagePayload;
pub use models::{ClassificationRequest, ClassificationResult, PartialClassification, ReportType};
pub use observer::{ClassificationObserver, RequestContext, TracingObserver};
pub use parser::{parse_reply, OutputLimits, ParsedReply, ReplySource};
pub use provider::{ChatCompletionProvider, ChatCompletionRequest, OpenRouterProvider};
pub use service::{Classification, ClassificationOutcome, ClassifierSettings, IncidentClassifier};
