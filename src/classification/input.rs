//! Normalization of the submitted image string into a bare base64 payload

use crate::classification::error::{ClassificationError, ClassifyResult};
use sha2::{Digest, Sha256};

/// Bare base64 payload extracted from a data-URL or raw submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: String,
}

impl ImagePayload {
    /// Extract the payload from `image`.
    ///
    /// A `data:` prefix means everything after the first comma is the payload;
    /// any other string is taken as base64 already.
    pub fn extract(image: &str) -> ClassifyResult<Self> {
        if image.starts_with("data:") {
            let (_, payload) = image.split_once(',').ok_or_else(|| {
                ClassificationError::InvalidInput("Invalid data URL format".to_string())
            })?;
            return Ok(Self {
                data: payload.to_string(),
            });
        }

        Ok(Self {
            data: image.to_string(),
        })
    }

    /// Fail unless the payload has at least `min_len` characters
    pub fn ensure_plausible(&self, min_len: usize) -> ClassifyResult<()> {
        if self.data.is_empty() || self.data.len() < min_len {
            return Err(ClassificationError::InvalidInput(format!(
                "Invalid or too small image data ({} characters, expected at least {})",
                self.data.len(),
                min_len
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload re-wrapped the way the provider expects it
    pub fn to_jpeg_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.data)
    }

    /// Short SHA-256 prefix for correlating logs without logging the image
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.data.as_bytes());
        digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
    }
}
