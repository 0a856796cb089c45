// Receipts domain: capture normalization, recognition model, persistence
// gateway and the ingestion pipeline that ties them together.

pub mod capture;
pub mod export;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod recognition;
pub mod store;

pub use capture::CaptureSource;
pub use persistence::{PersistError, PersistOutcome, PersistenceGateway};
pub use pipeline::{IngestionCoordinator, PipelineError, PipelineState, ScanOutcome};
pub use recognition::{LineItem, RecognitionResult};
