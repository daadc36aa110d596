//! Currency and percentage formatting, lenient parsing of display strings,
//! and amount validation.

use super::error::FolioError;

/// Format a value as dollars with thousands separators and two decimals.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${whole}.{:02}", cents % 100)
}

/// Format a percentage with an explicit sign for non-negative values.
pub fn format_percentage(value: f64) -> String {
    if !value.is_finite() {
        return "0.00%".to_string();
    }
    if value >= 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parse `"$1,850.00"`-style strings. Plain numbers are accepted too.
pub fn parse_currency(text: &str) -> Result<f64, FolioError> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    parse_decimal(&cleaned).ok_or_else(|| FolioError::DataFormat {
        reason: format!("not a currency value: {text:?}"),
    })
}

/// Parse `"+23.33%"`-style strings.
pub fn parse_percentage(text: &str) -> Result<f64, FolioError> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();
    parse_decimal(&cleaned).ok_or_else(|| FolioError::DataFormat {
        reason: format!("not a percentage value: {text:?}"),
    })
}

/// Optional sign, then digits with at most one point. No exponents or words.
fn parse_decimal(text: &str) -> Option<f64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !well_formed {
        return None;
    }
    text.parse().ok()
}

/// Reject zero, negative, NaN and infinite amounts.
pub fn validate_amount(field: &str, value: f64) -> Result<f64, FolioError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FolioError::invalid(field, value))
    }
}
