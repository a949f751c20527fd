//! Numeric extraction from free-form progress text.
//!
//! The generation service reports numbers embedded in prose. Two rules are in
//! use and they are deliberately different:
//!
//! - [`last_decimal`]: decimals allowed, the *last* match wins. Used for the
//!   running coverage percentage, which the service appends to a sentence.
//! - [`first_integer`]: digits only, the *first* match wins. Used for every
//!   summary field.

use std::sync::LazyLock;

use regex::Regex;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("decimal pattern is valid"));

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));

/// Last decimal-or-integer number in `text`.
pub fn last_decimal(text: &str) -> Option<f64> {
    DECIMAL
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

/// First run of digits in `text`. A decimal point ends the match, so
/// `"45.5"` yields `45.0`.
pub fn first_integer(text: &str) -> Option<f64> {
    INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}
