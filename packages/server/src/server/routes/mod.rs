// HTTP routes
pub mod health;
pub mod receipts;

pub use health::*;
pub use receipts::*;
