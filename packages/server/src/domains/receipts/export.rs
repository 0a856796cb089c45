//! CSV export of a persisted receipt.
//!
//! Layout: metadata block, blank line, items block with Name/Quantity/Price
//! columns. Prices use two decimals, dates ISO calendar format.

use super::models::{Receipt, ReceiptItem};

pub fn receipt_csv(receipt: &Receipt, items: &[ReceiptItem]) -> String {
    let mut out = String::new();

    out.push_str("Field,Value\n");
    push_row(&mut out, "Merchant", receipt.merchant.as_deref().unwrap_or(""));
    push_row(
        &mut out,
        "Date",
        &receipt
            .purchase_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    );
    push_row(
        &mut out,
        "Total",
        &receipt.total.map(format_money).unwrap_or_default(),
    );
    push_row(&mut out, "Currency", receipt.currency.as_deref().unwrap_or(""));
    push_row(&mut out, "Category", &receipt.category);

    out.push('\n');
    out.push_str("Name,Quantity,Price\n");
    for item in items {
        out.push_str(&format!(
            "{},{},{}\n",
            escape(&item.name),
            item.quantity.map(format_quantity).unwrap_or_default(),
            item.price.map(format_money).unwrap_or_default(),
        ));
    }

    out
}

fn push_row(out: &mut String, field: &str, value: &str) {
    out.push_str(&format!("{},{}\n", field, escape(value)));
}

fn format_money(value: f64) -> String {
    format!("{:.2}", value)
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Quote fields containing separators or quotes (RFC 4180).
fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
