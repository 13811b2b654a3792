//! Resolves free-text port mentions to a canonical `(code, name)` pair.
//!
//! Strategies run strictly in order and the first hit wins:
//! exact code, exact name, abbreviation, fuzzy substring, fuzzy token overlap.
//! Fuzzy strategies walk the reference dataset in insertion order so ties are
//! deterministic.

use crate::core::reference::ReferenceIndex;
use crate::domain::model::MatchResult;
use std::collections::HashSet;
use std::sync::Arc;

/// Abbreviations whose code also has an inland depot variation named `"<city> icd"`.
const ICD_PREFERRED: &[(&str, &str)] = &[
    ("MAA", "Chennai"),
    ("BLR", "Bangalore"),
    ("HYD", "Hyderabad"),
];

const NOISE_TOKENS: &[&str] = &["icd", "port"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ExactCode,
    ExactName,
    Abbreviation,
    FuzzySubstring,
    FuzzyTokens,
}

#[derive(Debug, Clone)]
pub struct PortMatcher {
    index: Arc<ReferenceIndex>,
}

impl PortMatcher {
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn match_port(&self, text: Option<&str>) -> Option<MatchResult> {
        self.match_with_strategy(text).map(|(result, _)| result)
    }

    /// Same as [`match_port`](Self::match_port) but also reports which strategy hit.
    pub fn match_with_strategy(&self, text: Option<&str>) -> Option<(MatchResult, MatchStrategy)> {
        let text = text?.trim();
        if text.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        let upper = text.to_uppercase();

        if let Some(result) = self.exact_code(&upper) {
            return Some((result, MatchStrategy::ExactCode));
        }
        if let Some(result) = self.exact_name(&lower) {
            return Some((result, MatchStrategy::ExactName));
        }
        if let Some(result) = self.abbreviation(&upper) {
            return Some((result, MatchStrategy::Abbreviation));
        }
        if let Some(result) = self.fuzzy_substring(&lower) {
            return Some((result, MatchStrategy::FuzzySubstring));
        }
        if let Some(result) = self.fuzzy_tokens(&lower) {
            return Some((result, MatchStrategy::FuzzyTokens));
        }

        tracing::debug!("No port match for '{}'", text);
        None
    }

    fn exact_code(&self, upper: &str) -> Option<MatchResult> {
        if upper.chars().count() != 5 || !upper.chars().all(char::is_alphabetic) {
            return None;
        }
        let name = self.index.canonical_name(upper)?;
        Some(MatchResult {
            code: upper.to_string(),
            name: name.to_string(),
        })
    }

    fn exact_name(&self, lower: &str) -> Option<MatchResult> {
        let entry = self.index.entry_for_name(lower)?;
        Some(MatchResult {
            code: entry.code.clone(),
            name: entry.name.clone(),
        })
    }

    fn abbreviation(&self, upper: &str) -> Option<MatchResult> {
        let len = upper.chars().count();
        if !(2..=4).contains(&len) || !upper.chars().all(char::is_alphabetic) {
            return None;
        }
        let code = self.index.code_for_abbreviation(upper)?;
        let name = self
            .icd_variation(upper, code)
            .or_else(|| self.index.canonical_name(code))?;

        Some(MatchResult {
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    fn icd_variation(&self, abbrev: &str, code: &str) -> Option<&str> {
        let (_, city) = ICD_PREFERRED.iter().find(|(a, _)| *a == abbrev)?;
        let wanted = format!("{} icd", city.to_lowercase());
        self.index
            .variations(code)
            .iter()
            .find(|v| v.normalized == wanted)
            .map(|v| v.name.as_str())
    }

    fn fuzzy_substring(&self, lower: &str) -> Option<MatchResult> {
        let text = strip_noise(lower);
        if text.is_empty() {
            return None;
        }

        self.index
            .iter_variations()
            .find(|(_, variation)| {
                let name = strip_noise(&variation.normalized);
                !name.is_empty() && (text.contains(name.as_str()) || name.contains(text.as_str()))
            })
            .map(|(code, variation)| MatchResult {
                code: code.to_string(),
                name: variation.name.clone(),
            })
    }

    fn fuzzy_tokens(&self, lower: &str) -> Option<MatchResult> {
        let words: HashSet<&str> = lower.split_whitespace().collect();
        let mut best: Option<(&str, &str)> = None;
        let mut best_score = 0;

        for (code, variation) in self.index.iter_variations() {
            let score = variation
                .normalized
                .split_whitespace()
                .collect::<HashSet<_>>()
                .intersection(&words)
                .count();
            // 同分保留先出現的
            if score > best_score {
                best_score = score;
                best = Some((code, variation.name.as_str()));
            }
        }

        best.map(|(code, name)| MatchResult {
            code: code.to_string(),
            name: name.to_string(),
        })
    }
}

fn strip_noise(text: &str) -> String {
    let mut cleaned = text.to_string();
    for token in NOISE_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_string()
}
