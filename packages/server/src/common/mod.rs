// Shared types used across domains
pub mod types;

pub use types::*;
