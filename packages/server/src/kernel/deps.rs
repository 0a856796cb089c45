//! Server dependencies for the ingestion pipeline (traits for testability)
//!
//! Central dependency container handed to the coordinator and HTTP handlers.
//! All external services sit behind trait abstractions so tests can inject
//! recording mocks.

use std::sync::Arc;

use super::traits::{
    BaseBlobStore, BaseReceiptStore, BaseRecognitionService, BaseTelemetrySink,
};

/// Dependencies accessible to the ingestion pipeline.
#[derive(Clone)]
pub struct ServerDeps {
    pub recognition: Arc<dyn BaseRecognitionService>,
    pub blob_store: Arc<dyn BaseBlobStore>,
    pub receipt_store: Arc<dyn BaseReceiptStore>,
    pub telemetry: Arc<dyn BaseTelemetrySink>,
}

impl ServerDeps {
    pub fn new(
        recognition: Arc<dyn BaseRecognitionService>,
        blob_store: Arc<dyn BaseBlobStore>,
        receipt_store: Arc<dyn BaseReceiptStore>,
        telemetry: Arc<dyn BaseTelemetrySink>,
    ) -> Self {
        Self {
            recognition,
            blob_store,
            receipt_store,
            telemetry,
        }
    }
}
