//! CSV export of recent results
//!
//! Fixed column order, every value quoted, prices converted to the selected
//! display currency at export time. The history itself always stores USD.

use campricer_common::currency::{convert_price, RateTable};
use campricer_common::types::HistoryEntry;
use chrono::{DateTime, Utc};

/// Export column order
pub const CSV_HEADERS: [&str; 6] = [
    "Camera",
    "Date",
    "eBay Price",
    "Amazon Price",
    "Facebook Marketplace Price",
    "Information",
];

/// Render history entries as CSV text
pub fn history_to_csv(entries: &[HistoryEntry], currency: &str, rates: &RateTable) -> String {
    let mut rows = Vec::with_capacity(entries.len() + 1);
    rows.push(CSV_HEADERS.join(","));

    for entry in entries {
        let row = [
            quote(&entry.camera),
            quote(&format_date(&entry.timestamp)),
            quote(&convert_price(&entry.prices.ebay, currency, rates)),
            quote(&convert_price(&entry.prices.amazon, currency, rates)),
            quote(&convert_price(&entry.prices.facebook_marketplace, currency, rates)),
            quote(&entry.information),
        ]
        .join(",");
        rows.push(row);
    }
    rows.join("\n")
}

/// Default export filename, dated for easy sorting
pub fn default_export_filename() -> String {
    format!("CamPricer_Results_{}.csv", Utc::now().format("%Y-%m-%d"))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn format_date(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
