//! Fire-and-forget telemetry.
//!
//! Events are dispatched on a detached task; a failing sink is logged at
//! debug and otherwise discarded. Telemetry never blocks the pipeline and
//! never participates in its error taxonomy.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::BaseTelemetrySink;

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub id: Uuid,
    pub name: &'static str,
    pub at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

/// Dispatch one event without awaiting the sink.
pub fn emit(sink: &Arc<dyn BaseTelemetrySink>, name: &'static str, detail: serde_json::Value) {
    let event = TelemetryEvent {
        id: Uuid::new_v4(),
        name,
        at: Utc::now(),
        detail,
    };
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(err) = sink.record(event).await {
            tracing::debug!(error = %err, "telemetry event dropped");
        }
    });
}

/// Default sink: structured log lines via tracing.
pub struct LogTelemetrySink;

#[async_trait]
impl BaseTelemetrySink for LogTelemetrySink {
    async fn record(&self, event: TelemetryEvent) -> Result<()> {
        tracing::info!(
            event = event.name,
            id = %event.id,
            detail = %event.detail,
            "telemetry"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{FailingTelemetrySink, RecordingTelemetrySink};

    #[tokio::test]
    async fn emit_delivers_to_the_sink() {
        let recorder = Arc::new(RecordingTelemetrySink::new());
        let sink: Arc<dyn BaseTelemetrySink> = recorder.clone();

        emit(&sink, "scan.started", serde_json::json!({ "n": 1 }));

        // Dispatch is detached; give the task a chance to run.
        for _ in 0..100 {
            if !recorder.event_names().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.event_names(), vec!["scan.started"]);
    }

    #[tokio::test]
    async fn sink_failures_are_discarded() {
        let sink: Arc<dyn BaseTelemetrySink> = Arc::new(FailingTelemetrySink);

        // Must neither panic nor surface the failure.
        emit(&sink, "scan.started", serde_json::json!({}));
        tokio::task::yield_now().await;
    }
}
