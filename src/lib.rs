//! Incident Classifier
//!
//! HTTP service that classifies citizen-submitted incident images through an
//! external vision model and always answers with a usable
//! `{title, reportType, description}` record.

pub mod api;
pub mod classification;
pub mod config;
pub mod error;
pub mod metrics;

pub use classification::{ClassificationResult, IncidentClassifier, ReportType};
pub use config::Config;
pub use error::{AppError, Result};
