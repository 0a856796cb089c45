//! Receipt scan and export endpoints.

use axum::extract::{Extension, Multipart, Path};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::domains::receipts::export::receipt_csv;
use crate::domains::receipts::recognition::LineItem;
use crate::domains::receipts::{CaptureSource, IngestionCoordinator, PipelineError, ScanOutcome};
use crate::kernel::recognition_client::RecognitionError;
use crate::kernel::traits::BaseReceiptStore;
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;

#[derive(Serialize)]
pub struct ScanResponse {
    pub receipt_id: i64,
    pub image_key: String,
    pub merchant: Option<String>,
    pub date: Option<String>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub category: String,
    pub items: Vec<LineItem>,
    /// False on partial success: the receipt was saved, its items were not.
    pub items_saved: bool,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            receipt_id: outcome.receipt.id,
            image_key: outcome.receipt.image_key,
            merchant: outcome.recognition.merchant,
            date: outcome.recognition.date,
            total: outcome.recognition.total,
            currency: outcome.recognition.currency,
            category: outcome.recognition.category,
            items: outcome.recognition.items,
            items_saved: outcome.items_saved,
        }
    }
}

/// Scan a receipt image: analyze remotely, then persist image + header +
/// items for the authenticated owner.
pub async fn scan_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    mut multipart: Multipart,
) -> Response {
    let Some(Extension(user)) = auth else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };

    let capture = match read_image_part(&mut multipart).await {
        Ok(Some(capture)) => capture,
        Ok(None) => return error_json(StatusCode::UNPROCESSABLE_ENTITY, "no image selected"),
        Err(response) => return response,
    };

    let coordinator = IngestionCoordinator::new((*state.server_deps).clone());
    if let Err(err) = coordinator.select_capture(capture) {
        return pipeline_error_response(err);
    }

    match coordinator.submit(&user.owner_id).await {
        Ok(outcome) => (StatusCode::OK, Json(ScanResponse::from(outcome))).into_response(),
        Err(err) => pipeline_error_response(err),
    }
}

async fn read_image_part(multipart: &mut Multipart) -> Result<Option<CaptureSource>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(err) => {
                return Err(error_json(
                    StatusCode::BAD_REQUEST,
                    &format!("malformed multipart body: {err}"),
                ))
            }
        };

        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|err| {
            error_json(
                StatusCode::BAD_REQUEST,
                &format!("could not read image: {err}"),
            )
        })?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(CaptureSource::from_file(
            bytes.to_vec(),
            filename,
            content_type,
        )));
    }
}

/// Map pipeline errors to user-facing responses. Nothing propagates uncaught.
fn pipeline_error_response(err: PipelineError) -> Response {
    match &err {
        PipelineError::NoCapture => error_json(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string()),
        PipelineError::Busy => error_json(StatusCode::CONFLICT, &err.to_string()),
        PipelineError::Camera(_) => error_json(StatusCode::SERVICE_UNAVAILABLE, &err.to_string()),
        PipelineError::Recognition(recognition) => match recognition {
            RecognitionError::Timeout => error_json(StatusCode::GATEWAY_TIMEOUT, &err.to_string()),
            // Unreachable and BadResponse get distinct messages: the
            // remediation differs.
            RecognitionError::Unreachable(_) => error_json(
                StatusCode::BAD_GATEWAY,
                "recognition service unreachable; check the server",
            ),
            RecognitionError::BadResponse { .. } | RecognitionError::BadPayload(_) => {
                error_json(StatusCode::BAD_GATEWAY, &err.to_string())
            }
        },
        PipelineError::Persistence(_) => {
            error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// List the authenticated owner's receipts, newest first.
pub async fn list_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
) -> Response {
    let Some(Extension(user)) = auth else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };

    match state.server_deps.receipt_store.list_receipts(&user.owner_id).await {
        Ok(receipts) => (StatusCode::OK, Json(receipts)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "receipt listing failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "listing failed")
        }
    }
}

/// Export one receipt as CSV: metadata block, blank line, items block.
pub async fn export_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(receipt_id) = id.parse::<i64>() else {
        return error_json(StatusCode::BAD_REQUEST, "invalid receipt id");
    };
    let Some(Extension(user)) = auth else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };

    let store = &state.server_deps.receipt_store;
    let receipt = match store.find_receipt(receipt_id, &user.owner_id).await {
        Ok(Some(receipt)) => receipt,
        Ok(None) => return error_json(StatusCode::NOT_FOUND, "receipt not found"),
        Err(err) => {
            tracing::error!(error = %err, receipt_id, "export lookup failed");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "export failed");
        }
    };

    let items = match store.list_items(receipt_id).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!(error = %err, receipt_id, "export item lookup failed");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "export failed");
        }
    };

    let csv = receipt_csv(&receipt, &items);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"receipt-{receipt_id}.csv\""),
            ),
        ],
        csv,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::receipts::persistence::PersistError;
    use crate::kernel::camera::CameraError;

    fn status_of(err: PipelineError) -> StatusCode {
        pipeline_error_response(err).status()
    }

    async fn error_message(err: PipelineError) -> String {
        let response = pipeline_error_response(err);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[test]
    fn validation_and_concurrency_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(PipelineError::NoCapture),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(PipelineError::Busy), StatusCode::CONFLICT);
    }

    #[test]
    fn camera_errors_map_to_service_unavailable() {
        assert_eq!(
            status_of(PipelineError::Camera(CameraError::DeviceUnavailable(
                "busy".to_string()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(PipelineError::Camera(CameraError::PermissionDenied(
                "/dev/video0".to_string()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn recognition_errors_map_to_gateway_statuses() {
        assert_eq!(
            status_of(PipelineError::Recognition(RecognitionError::Unreachable(
                "connection refused".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PipelineError::Recognition(RecognitionError::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(PipelineError::Recognition(RecognitionError::BadPayload(
                "not json".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn bad_response_surfaces_the_server_body() {
        let err = PipelineError::Recognition(RecognitionError::BadResponse {
            status: 500,
            body: "model overloaded".to_string(),
        });
        let response = pipeline_error_response(err);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let err = PipelineError::Recognition(RecognitionError::BadResponse {
            status: 500,
            body: "model overloaded".to_string(),
        });
        let message = error_message(err).await;
        assert!(message.contains("model overloaded"), "{message}");
    }

    #[test]
    fn persistence_failures_are_internal_errors() {
        assert_eq!(
            status_of(PipelineError::Persistence(PersistError::BlobStore(
                anyhow::anyhow!("disk full")
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(PipelineError::Persistence(PersistError::HeaderInsert(
                anyhow::anyhow!("db down")
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
