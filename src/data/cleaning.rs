//! City-name normalization
//!
//! The source workbook carries free-text city names with a known set of
//! misspellings and aliases. Cleaning is a deterministic string transform:
//! trim, title-case, then exact-match correction against a static table.

use polars::prelude::*;

use crate::error::Result;

/// Known misspellings/aliases mapped to canonical city names.
pub const CITY_CORRECTIONS: &[(&str, &str)] = &[
    ("Surrat", "Surat"),
    ("Chennnai", "Chennai"),
    ("Kalkata", "Kolkata"),
    ("Calcutta", "Kolkata"),
    ("Mumbay", "Mumbai"),
    ("Mumbaai", "Mumbai"),
    ("Bengluru", "Bengaluru"),
    ("Poona", "Pune"),
    ("Jaypur", "Jaipur"),
    ("Ahemdabad", "Ahmedabad"),
    ("Dehli", "Delhi"),
    ("New Delhi", "Delhi"),
    ("Nodia", "Noida"),
    ("Hyderbad", "Hyderabad"),
    ("Gurugram", "Gurgaon"),
];

/// Title-case a string: first letter of each alphabetic run uppercased,
/// the rest lowercased. Non-alphabetic characters are word boundaries.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Normalize a single city value: trim, title-case, correct.
pub fn normalize_city(raw: &str) -> String {
    let cased = title_case(raw.trim());
    match CITY_CORRECTIONS.iter().find(|(bad, _)| *bad == cased) {
        Some((_, canonical)) => (*canonical).to_string(),
        None => cased,
    }
}

/// Standardize the `city` column of a table.
///
/// Tables without a `city` column pass through unchanged. Null values are
/// preserved as nulls.
pub fn clean_city_names(df: &DataFrame) -> Result<DataFrame> {
    if df.column("city").is_err() {
        return Ok(df.clone());
    }

    let series = df.column("city")?.as_materialized_series();
    let ca = series.str()?;

    let cleaned: StringChunked = ca
        .into_iter()
        .map(|opt| opt.map(normalize_city))
        .collect();

    let mut result = df.clone();
    result.with_column(cleaned.with_name("city".into()))?;
    Ok(result)
}
