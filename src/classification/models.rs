use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Title used when the provider credential is absent
pub const NOT_CONFIGURED_TITLE: &str = "Emergency Report - Manual Entry Required";

/// Description used when the provider credential is absent
pub const NOT_CONFIGURED_DESCRIPTION: &str =
    "Image analysis service is not configured. Please provide details manually.";

/// Description used when classification failed outright
pub const DEGRADED_DESCRIPTION: &str =
    "Unable to analyze image automatically. Please provide incident details manually.";

/// Description used when the model answered but no description could be extracted
pub const MISSING_DESCRIPTION: &str =
    "Emergency situation detected in uploaded image. Please provide additional details.";

/// Closed set of incident categories a report can carry
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, EnumString, Display, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ReportType {
    #[strum(serialize = "Theft")]
    Theft,
    #[serde(rename = "Fire Outbreak")]
    #[strum(serialize = "Fire Outbreak")]
    FireOutbreak,
    #[serde(rename = "Medical Emergency")]
    #[strum(serialize = "Medical Emergency")]
    MedicalEmergency,
    #[serde(rename = "Natural Disaster")]
    #[strum(serialize = "Natural Disaster")]
    NaturalDisaster,
    #[strum(serialize = "Violence")]
    Violence,
    #[default]
    #[strum(serialize = "Other")]
    Other,
}

/// Outcome of mapping a free-form category onto [`ReportType`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReportType {
    pub report_type: ReportType,
    /// The raw value when it had to be coerced to `Other`
    pub coerced_from: Option<String>,
}

impl ReportType {
    /// Map a model-supplied category onto the closed set.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Anything unrecognised becomes `Other` and remembers the raw value.
    pub fn normalize(raw: Option<&str>) -> NormalizedReportType {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return NormalizedReportType {
                report_type: ReportType::Other,
                coerced_from: None,
            };
        };

        match ReportType::from_str(raw) {
            Ok(report_type) => NormalizedReportType {
                report_type,
                coerced_from: None,
            },
            Err(_) => NormalizedReportType {
                report_type: ReportType::Other,
                coerced_from: Some(raw.to_string()),
            },
        }
    }
}

/// Body of `POST /analyze-image`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassificationRequest {
    /// Data-URL (`data:<mime>;base64,<payload>`) or raw base64
    #[serde(default)]
    pub image: Option<String>,
}

/// Normalized classification of an incident image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub title: String,
    pub report_type: ReportType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationResult {
    /// Record returned when no provider credential is configured
    pub fn not_configured() -> Self {
        Self {
            title: NOT_CONFIGURED_TITLE.to_string(),
            report_type: ReportType::Other,
            description: NOT_CONFIGURED_DESCRIPTION.to_string(),
            warning: None,
            error: None,
        }
    }

    /// Record returned when classification failed, stamped with today's date
    pub fn degraded(diagnostic: impl Into<String>) -> Self {
        Self::degraded_on(Utc::now().date_naive(), diagnostic)
    }

    /// Record returned when classification failed, stamped with `date`
    pub fn degraded_on(date: NaiveDate, diagnostic: impl Into<String>) -> Self {
        Self {
            title: format!("Emergency Report - {}", format_report_date(date)),
            report_type: ReportType::Other,
            description: DEGRADED_DESCRIPTION.to_string(),
            warning: None,
            error: Some(diagnostic.into()),
        }
    }

    /// Whether this record came out of a failure path
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Fields recovered from a model reply before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialClassification {
    pub title: Option<String>,
    pub report_type: Option<String>,
    pub description: Option<String>,
}

impl PartialClassification {
    /// True when every field carries a non-blank value
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.report_type, &self.description]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Date stamp used in generated titles, e.g. `10/17/2026`
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
