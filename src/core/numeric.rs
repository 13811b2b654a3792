//! Weight and volume normalization: free text in, kilograms / cubic meters out.

use regex::Regex;
use std::sync::LazyLock;

const SENTINELS: &[&str] = &["TBD", "N/A", "NA", "TO BE CONFIRMED", "TBC", "PENDING"];

const LBS_TO_KG: f64 = 0.453592;
// RT (revenue ton) 視同公噸
const TONNE_TO_KG: f64 = 1000.0;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?)([0-9][0-9,]*(?:\.[0-9]*)?)").expect("valid number regex")
});

static DIMENSIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+\s*[xX×]\s*[0-9]+\s*[xX×]\s*[0-9]+").expect("valid dimensions regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Kilograms,
    Pounds,
    Tonnes,
}

impl WeightUnit {
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("lb") || lower.contains("pound") {
            WeightUnit::Pounds
        } else if lower.contains("ton") || lower.contains("mt") || lower.contains("rt") {
            WeightUnit::Tonnes
        } else {
            WeightUnit::Kilograms
        }
    }

    pub fn to_kg_factor(&self) -> f64 {
        match self {
            WeightUnit::Kilograms => 1.0,
            WeightUnit::Pounds => LBS_TO_KG,
            WeightUnit::Tonnes => TONNE_TO_KG,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_sentinel(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    SENTINELS.contains(&upper.as_str())
}

pub fn is_dimensions(text: &str) -> bool {
    DIMENSIONS_RE.is_match(text)
}

/// First number in the text, thousands separators removed.
/// A leading `-` is a sign only at the start of the text or after whitespace,
/// so "wt-500" reads as 500.
pub fn extract_number(text: &str) -> Option<f64> {
    let caps = NUMBER_RE.captures(text)?;
    let value = caps.get(2)?.as_str().replace(',', "").parse::<f64>().ok()?;

    let negative = caps.get(1).is_some_and(|sign| {
        !sign.as_str().is_empty()
            && text[..sign.start()]
                .chars()
                .next_back()
                .map_or(true, char::is_whitespace)
    });
    Some(if negative { -value } else { value })
}

// -0 一律輸出成 0
fn non_negative(value: f64) -> Option<f64> {
    if value < 0.0 {
        return None;
    }
    let rounded = round2(value);
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}

pub fn process_weight(text: Option<&str>) -> Option<f64> {
    let text = text?;
    if text.trim().is_empty() || is_sentinel(text) {
        return None;
    }

    let number = extract_number(text)?;
    non_negative(number * WeightUnit::detect(text).to_kg_factor())
}

pub fn process_cbm(text: Option<&str>) -> Option<f64> {
    let text = text?;
    if text.trim().is_empty() || is_sentinel(text) {
        return None;
    }
    // 只有尺寸時不推算體積
    if is_dimensions(text) {
        return None;
    }

    non_negative(extract_number(text)?)
}
