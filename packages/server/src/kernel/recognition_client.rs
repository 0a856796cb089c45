use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::domains::receipts::capture::CaptureSource;
use crate::domains::receipts::recognition::RecognitionResult;

use super::traits::BaseRecognitionService;

/// Errors from the remote recognition service.
///
/// `Unreachable` and `BadResponse` are deliberately distinct: the remediation
/// shown to the user differs ("check the server" vs. "try again").
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    #[error("recognition service unreachable: {0}")]
    Unreachable(String),

    /// The server replied with a non-success status; the raw body is kept
    /// verbatim for diagnostic surfacing.
    #[error("recognition service returned {status}: {body}")]
    BadResponse { status: u16, body: String },

    #[error("recognition request timed out")]
    Timeout,

    /// 2xx reply whose body did not parse as a recognition result.
    #[error("could not parse recognition response: {0}")]
    BadPayload(String),
}

/// HTTP client for the receipt recognition service.
///
/// Sends the captured image as a single binary payload to
/// `<base>/analyze-receipt`. Never retries.
pub struct HttpRecognitionClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRecognitionClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze-receipt", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl BaseRecognitionService for HttpRecognitionClient {
    async fn analyze(
        &self,
        capture: &CaptureSource,
    ) -> Result<RecognitionResult, RecognitionError> {
        let response = self
            .client
            .post(self.analyze_url())
            .header(CONTENT_TYPE, capture.mime_type.as_str())
            .body(capture.bytes.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are surfaced verbatim; no attempt to salvage
            // partial JSON out of them.
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::BadResponse {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        parse_analysis_body(&body)
    }
}

fn classify_transport_error(err: reqwest::Error) -> RecognitionError {
    if err.is_timeout() {
        RecognitionError::Timeout
    } else {
        RecognitionError::Unreachable(err.to_string())
    }
}

pub(crate) fn parse_analysis_body(body: &str) -> Result<RecognitionResult, RecognitionError> {
    serde_json::from_str(body).map_err(|err| RecognitionError::BadPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn capture() -> CaptureSource {
        CaptureSource::from_file(vec![0x01, 0x02], "receipt.jpg", "image/jpeg")
    }

    #[tokio::test]
    async fn analyze_parses_successful_response() {
        let router = Router::new().route(
            "/analyze-receipt",
            post(|| async {
                r#"{"merchant":"Acme","date":"2024-03-01","total":12.5,"currency":"USD",
                    "category":"Groceries","items":[{"name":"Milk","quantity":1,"price":3.5}]}"#
            }),
        );
        let base = serve(router).await;

        let client = HttpRecognitionClient::new(base, Duration::from_secs(5)).unwrap();
        let result = client.analyze(&capture()).await.unwrap();

        assert_eq!(result.merchant.as_deref(), Some("Acme"));
        assert_eq!(result.total, Some(12.5));
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].name, "Milk");
    }

    #[tokio::test]
    async fn error_status_surfaces_body_verbatim() {
        let router = Router::new().route(
            "/analyze-receipt",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") }),
        );
        let base = serve(router).await;

        let client = HttpRecognitionClient::new(base, Duration::from_secs(5)).unwrap();
        let err = client.analyze(&capture()).await.unwrap_err();

        match err {
            RecognitionError::BadResponse { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model overloaded");
            }
            other => panic!("expected BadResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_unreachable() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpRecognitionClient::new(format!("http://{}", addr), Duration::from_secs(5))
                .unwrap();
        let err = client.analyze(&capture()).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Unreachable(_)), "{err:?}");
    }

    #[test]
    fn missing_total_stays_absent() {
        let result = parse_analysis_body(r#"{"merchant":"Acme"}"#).unwrap();
        assert_eq!(result.total, None);
    }

    #[test]
    fn garbage_body_is_a_payload_error() {
        let err = parse_analysis_body("not json").unwrap_err();
        assert!(matches!(err, RecognitionError::BadPayload(_)));
    }
}
