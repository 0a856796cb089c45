// Infrastructure layer: trait boundaries for external collaborators and
// their production implementations.

pub mod blob_store;
pub mod camera;
pub mod deps;
pub mod recognition_client;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
pub mod test_dependencies;

pub use blob_store::FsBlobStore;
pub use camera::{Camera, CameraError, CameraOptions, CameraSession, FacingHint};
pub use deps::ServerDeps;
pub use recognition_client::{HttpRecognitionClient, RecognitionError};
pub use telemetry::{emit, LogTelemetrySink, TelemetryEvent};
pub use traits::{BaseBlobStore, BaseReceiptStore, BaseRecognitionService, BaseTelemetrySink};
