//! Instruction prompt sent alongside the image

use crate::classification::models::ReportType;
use strum::IntoEnumIterator;

/// Comma-separated list of accepted report types, in declaration order
pub fn report_type_options() -> String {
    ReportType::iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the instruction prompt for incident image analysis
pub fn build_prompt() -> String {
    format!(
        r#"You are an emergency response AI analyzing an incident image.

Analyze this image and provide a JSON response with exactly these fields:
{{
  "title": "Brief descriptive title of the incident (max 50 characters)",
  "reportType": "Must be one of: {options}",
  "description": "Detailed description of what you observe in the image (2-3 sentences)"
}}

Rules:
- Be specific and factual
- Choose the most appropriate reportType from the exact options provided
- If unclear, use "Other" as reportType
- Respond ONLY with valid JSON, no additional text
- Do not include markdown formatting or code blocks

If you cannot produce JSON, answer with exactly three lines instead:
TITLE: <title>
TYPE: <one of: {options}>
DESCRIPTION: <description>"#,
        options = report_type_options()
    )
}
