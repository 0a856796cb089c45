// Receipt Scanner - API Core
//
// Backend for capturing receipt photos, extracting structured data through a
// remote recognition service, and persisting the result (image blob + receipt
// header + line items) for the owning user.
//
// The ingestion pipeline lives in domains/receipts; infrastructure (camera,
// recognition client, blob store, telemetry) lives in kernel.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
