/// Lenient numeric coercion shared across the engine and the session layer.
///
/// Values reaching the engine from grid edits or imports arrive as free-form
/// strings ("1.234,56", "R$ 99,90", partially typed numbers). The contract is
/// deliberately forgiving: anything unparseable coerces to a fallback value
/// instead of raising, so an order stays editable while a field is mid-edit.
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// Characters that can never be part of a number: stripped before parsing.
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9,.\-]").expect("static regex"));

/// Parses a UI-origin decimal string, coercing failures to zero.
///
/// Accepts plain (`1234.56`) and Brazilian (`1.234,56`) formats, with any
/// currency symbol or stray text stripped first.
pub fn parse_decimal_lenient(input: &str) -> Decimal {
    parse_decimal_or(input, Decimal::ZERO)
}

/// Parses a UI-origin decimal string, coercing failures to `default`.
pub fn parse_decimal_or(input: &str, default: Decimal) -> Decimal {
    let stripped = NON_NUMERIC.replace_all(input.trim(), "");
    if stripped.is_empty() || stripped.as_ref() == "-" {
        return default;
    }
    normalize_separators(&stripped)
        .parse::<Decimal>()
        .unwrap_or(default)
}

/// Parses a quantity field. Blank or unparseable input yields zero; callers
/// that still want the legacy single-entry default of one pass it through
/// [`parse_quantity_or`] explicitly.
pub fn parse_quantity(input: &str) -> Decimal {
    parse_decimal_or(input, Decimal::ZERO)
}

/// Quantity parse with an explicit fallback for blank/unparseable input.
pub fn parse_quantity_or(input: &str, default: Decimal) -> Decimal {
    parse_decimal_or(input, default)
}

/// `1 + rate/100`, the multiplier for a percentage surcharge.
pub fn percent_factor(rate: Decimal) -> Decimal {
    Decimal::ONE + rate / Decimal::ONE_HUNDRED
}

/// Rewrites separator conventions into the canonical `1234.56` form.
///
/// When both separators appear the rightmost one is the decimal mark. A lone
/// comma or dot is a decimal mark; a separator repeated in digit triples is
/// grouping and is dropped entirely.
fn normalize_separators(raw: &str) -> String {
    let last_dot = raw.rfind('.');
    let last_comma = raw.rfind(',');

    match (last_dot, last_comma) {
        (None, None) => raw.to_string(),
        (Some(dot), Some(comma)) => mark_decimal(raw, dot.max(comma)),
        (Some(dot), None) => {
            if raw.matches('.').count() > 1 && grouped_triples(raw, '.') {
                strip_separators(raw)
            } else {
                mark_decimal(raw, dot)
            }
        }
        (None, Some(comma)) => {
            if raw.matches(',').count() > 1 && grouped_triples(raw, ',') {
                strip_separators(raw)
            } else {
                mark_decimal(raw, comma)
            }
        }
    }
}

/// Drops every separator except the one at `decimal_at`, which becomes a dot.
fn mark_decimal(raw: &str, decimal_at: usize) -> String {
    raw.char_indices()
        .filter_map(|(i, c)| match c {
            '.' | ',' if i != decimal_at => None,
            '.' | ',' => Some('.'),
            other => Some(other),
        })
        .collect()
}

fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '.' | ',')).collect()
}

/// True when every group after the first is a digit triple, meaning the
/// separator is grouping rather than a decimal mark.
fn grouped_triples(raw: &str, sep: char) -> bool {
    let groups: Vec<&str> = raw.trim_start_matches('-').split(sep).collect();
    groups.len() > 2 && groups[1..].iter().all(|g| g.len() == 3)
}
