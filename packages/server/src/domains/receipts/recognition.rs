//! Structured output of the recognition service.
//!
//! Every field the recognizer may fail to extract is a true `Option`; the
//! distinction between "recognizer found $0.00" and "recognizer found
//! nothing" must survive parsing.

use serde::{Deserialize, Serialize};

/// One recognized line item on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
}

/// Structured receipt data returned by the recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub merchant: Option<String>,
    /// Calendar date as reported by the recognizer (no time component).
    pub date: Option<String>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

fn default_category() -> String {
    "Other".to_string()
}
