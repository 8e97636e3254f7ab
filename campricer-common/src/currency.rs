//! Currency tables and price conversion
//!
//! Prices arrive from the recognition service as USD-denominated display
//! strings. Conversion is a pure formatting step applied at display and
//! export time; it never mutates stored records. Anything that does not
//! parse cleanly comes back unchanged rather than as a garbled partial
//! conversion.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One supported display currency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    /// ISO 4217 code
    pub code: &'static str,
    /// Display symbol prefixed to converted values
    pub symbol: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Region string sent to the recognition service for locale-aware pricing
    pub region: &'static str,
}

/// Supported display currencies
pub const CURRENCIES: &[Currency] = &[
    Currency { code: "USD", symbol: "$", name: "US Dollar", region: "United States" },
    Currency { code: "EUR", symbol: "\u{20ac}", name: "Euro", region: "Europe" },
    Currency { code: "GBP", symbol: "\u{a3}", name: "British Pound", region: "United Kingdom" },
    Currency { code: "JPY", symbol: "\u{a5}", name: "Japanese Yen", region: "Japan" },
    Currency { code: "CAD", symbol: "C$", name: "Canadian Dollar", region: "Canada" },
    Currency { code: "AUD", symbol: "A$", name: "Australian Dollar", region: "Australia" },
    Currency { code: "MXN", symbol: "$", name: "Mexican Peso", region: "Mexico" },
    Currency { code: "BRL", symbol: "R$", name: "Brazilian Real", region: "Brazil" },
];

/// Currency-code → USD multiplier table
pub type RateTable = HashMap<String, f64>;

static FALLBACK_RATES: Lazy<RateTable> = Lazy::new(|| {
    [
        ("USD", 1.0),
        ("EUR", 0.92),
        ("GBP", 0.79),
        ("JPY", 150.0),
        ("CAD", 1.36),
        ("AUD", 1.52),
        ("MXN", 17.1),
        ("BRL", 5.05),
    ]
    .into_iter()
    .map(|(code, rate)| (code.to_string(), rate))
    .collect()
});

/// Static rate table used when the live feed is unavailable
pub fn fallback_rates() -> RateTable {
    FALLBACK_RATES.clone()
}

/// Look up a supported currency by code
pub fn currency_for(code: &str) -> Option<&'static Currency> {
    CURRENCIES.iter().find(|c| c.code == code)
}

/// Region string for a currency code, defaulting to the US
pub fn region_for(code: &str) -> &'static str {
    currency_for(code).map(|c| c.region).unwrap_or("United States")
}

/// Display symbol for a currency code, defaulting to `$`
pub fn symbol_for(code: &str) -> &'static str {
    currency_for(code).map(|c| c.symbol).unwrap_or("$")
}

/// Currencies conventionally written without decimal places
fn is_zero_decimal(code: &str) -> bool {
    matches!(code, "JPY")
}

/// Convert a USD price string into the target currency for display
///
/// - `"N/A"`, empty input, or an unknown target code returns the input
///   unchanged.
/// - Ranges (`"$50 - $100"`) convert element-wise, each side rounded
///   independently, with the target symbol prefixed on each side.
/// - Zero-decimal currencies round to whole units, everything else to two
///   decimal places.
/// - Non-numeric residue after symbol stripping returns the original input.
pub fn convert_price(price: &str, target: &str, rates: &RateTable) -> String {
    let trimmed = price.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return price.to_string();
    }
    let Some(rate) = rates.get(target).copied() else {
        return price.to_string();
    };

    let symbol = symbol_for(target);
    let decimals = if is_zero_decimal(target) { 0 } else { 2 };

    if let Some((low, high)) = trimmed.split_once(" - ") {
        match (
            convert_single(low, symbol, rate, decimals),
            convert_single(high, symbol, rate, decimals),
        ) {
            (Some(low), Some(high)) => format!("{low} - {high}"),
            _ => price.to_string(),
        }
    } else {
        convert_single(trimmed, symbol, rate, decimals).unwrap_or_else(|| price.to_string())
    }
}

/// Convert one price token; `None` when no clean number remains after
/// stripping symbols and thousands separators
fn convert_single(part: &str, symbol: &str, rate: f64, decimals: usize) -> Option<String> {
    let cleaned: String = part
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    let converted = value * rate;
    Some(format!("{symbol}{converted:.decimals$}"))
}
