use regex::Regex;
use std::sync::LazyLock;

/// Negations are checked before any positive pattern: "non-hazardous ... class 3"
/// is not dangerous.
static NEGATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bnon[-\s]?dg\b").unwrap(),
        Regex::new(r"(?i)\bnon[-\s]?hazardous\b").unwrap(),
        Regex::new(r"(?i)\bnot\s+dangerous\b").unwrap(),
        Regex::new(r"(?i)\bnon\s+dangerous\b").unwrap(),
        Regex::new(r"(?i)\bnon[-\s]?dangerous\b").unwrap(),
        Regex::new(r"(?i)\bnon\s+hazmat\b").unwrap(),
    ]
});

static POSITIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:dg\b|d\.g\.)").unwrap(),
        Regex::new(r"(?i)\bdangerous\b").unwrap(),
        Regex::new(r"(?i)\bhazardous\b").unwrap(),
        Regex::new(r"(?i)\bhazmat\b").unwrap(),
        Regex::new(r"(?i)\bclass\s*[0-9]\b").unwrap(),
        Regex::new(r"(?i)\bimo\b").unwrap(),
        Regex::new(r"(?i)\bimdg\b").unwrap(),
        Regex::new(r"(?i)\bun\s*[0-9]{4}\b").unwrap(),
        Regex::new(r"(?i)\bflammable\b").unwrap(),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DgClassification {
    Negated,
    Positive,
    Unknown,
}

impl DgClassification {
    pub fn is_dangerous(&self) -> bool {
        matches!(self, DgClassification::Positive)
    }
}

pub fn classify(text: &str) -> DgClassification {
    if text.trim().is_empty() {
        return DgClassification::Unknown;
    }
    let lower = text.to_lowercase();

    if NEGATION_PATTERNS.iter().any(|re| re.is_match(&lower)) {
        return DgClassification::Negated;
    }
    if POSITIVE_PATTERNS.iter().any(|re| re.is_match(&lower)) {
        return DgClassification::Positive;
    }
    DgClassification::Unknown
}

/// 未提及視為非危險品
pub fn detect(text: Option<&str>) -> bool {
    text.map(|t| classify(t).is_dangerous()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_wins_over_positive() {
        assert!(!detect(Some("non-hazardous cargo, Class 3 placard")));
        assert!(!detect(Some("Non-DG shipment, previously listed as UN1263")));
        assert!(!detect(Some("cargo is NOT dangerous")));
        assert_eq!(classify("non hazmat, flammable label removed"), DgClassification::Negated);
    }

    #[test]
    fn test_positive_patterns() {
        assert!(detect(Some("UN1203 flammable liquid")));
        assert!(detect(Some("DG cargo, IMO class 3")));
        assert!(detect(Some("Hazardous materials")));
        assert!(detect(Some("IMDG code applies")));
        assert!(detect(Some("class9 lithium batteries")));
        assert!(detect(Some("UN 3480")));
        assert!(detect(Some("packed as d.g. cargo")));
    }

    #[test]
    fn test_dg_requires_word_boundary() {
        assert!(!detect(Some("DGFT licence attached")));
    }

    #[test]
    fn test_unknown_defaults_to_false() {
        assert!(!detect(Some("general cargo")));
        assert!(!detect(Some("")));
        assert!(!detect(None));
        assert_eq!(classify("garments, 12 cartons"), DgClassification::Unknown);
    }
}
