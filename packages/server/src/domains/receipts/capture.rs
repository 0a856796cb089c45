//! Capture normalization.
//!
//! A `CaptureSource` is the single input artifact the ingestion pipeline
//! consumes, regardless of whether the image came from an uploaded file or
//! from a camera frame.

use chrono::{DateTime, Utc};

/// Immutable captured image, normalized from either input path.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl CaptureSource {
    /// Normalize a user-selected file.
    ///
    /// Never fails: missing metadata is substituted so downstream code can
    /// rely on non-empty `filename` and `mime_type`.
    pub fn from_file(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let filename = non_empty(filename.into(), "upload.bin");
        let mime_type = non_empty(mime_type.into(), "application/octet-stream");
        Self {
            bytes,
            filename,
            mime_type,
            created_at: Utc::now(),
        }
    }

    /// Normalize a still frame sampled from a camera session.
    ///
    /// The camera path has no user-supplied name, so a synthetic one is
    /// derived from the capture instant (millisecond precision keeps names
    /// unique per capture).
    pub fn from_camera_frame(bytes: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self {
            bytes,
            filename: format!("camera-{}.jpg", captured_at.format("%Y%m%dT%H%M%S%3f")),
            mime_type: "image/jpeg".to_string(),
            created_at: captured_at,
        }
    }

    /// File extension used in storage keys.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => self
                .filename
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .filter(|ext| !ext.is_empty())
                .unwrap_or("bin"),
        }
    }
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
