//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Date part of a timestamp, e.g. `2026-10-18`.
///
/// Usage in templates: `{{ order.created_at|short_date }}`
#[askama::filter_fn]
pub fn short_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(date_part(&value.to_string()).to_owned())
}

fn date_part(timestamp: &str) -> &str {
    timestamp
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(timestamp)
}
