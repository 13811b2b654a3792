//! Emails that list several legs ("SHA → MAA 2 cbm; NGB → MAA ICD 300 kg")
//! are collapsed into one record when every leg shares an Indian side.

use crate::core::port_matcher::PortMatcher;
use crate::domain::model::{AggregatedShipment, MatchResult, PortAssignment, ShipmentCandidate};
use regex::Regex;
use std::sync::LazyLock;

pub const INDIA_PREFIX: &str = "IN";

const NAME_SEPARATOR: &str = " / ";

static SHIPMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([A-Z]{2,5})\s*→\s*([A-Z\s]{2,20}(?:ICD)?)\s*([0-9.,]+\s*(?:cbm|kg|KGS|CBM|RT|MT)?)?",
    )
    .unwrap()
});

pub fn is_indian_port(code: &str) -> bool {
    code.starts_with(INDIA_PREFIX)
}

pub fn is_multi_shipment(body: &str) -> bool {
    body.contains(';') && body.contains('→')
}

pub fn parse_shipments(body: &str, matcher: &PortMatcher) -> Vec<ShipmentCandidate> {
    SHIPMENT_RE
        .captures_iter(body)
        .map(|caps| {
            let origin_text = caps.get(1).map(|m| m.as_str().trim());
            let dest_text = caps.get(2).map(|m| m.as_str().trim());
            let cargo_text = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());

            ShipmentCandidate {
                origin: matcher.match_port(origin_text),
                destination: matcher.match_port(dest_text),
                cargo_text,
            }
        })
        .collect()
}

fn all_indian<'a>(mut codes: impl Iterator<Item = &'a str>) -> bool {
    // 沒有任何已解析的代碼時不彙整
    match codes.next() {
        None => false,
        Some(first) => is_indian_port(first) && codes.all(is_indian_port),
    }
}

pub fn should_aggregate(candidates: &[ShipmentCandidate]) -> bool {
    let destinations = candidates
        .iter()
        .filter_map(|c| c.destination.as_ref().map(|m| m.code.as_str()));
    let origins = candidates
        .iter()
        .filter_map(|c| c.origin.as_ref().map(|m| m.code.as_str()));

    all_indian(destinations) || all_indian(origins)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn combine<'a, F>(candidates: &'a [ShipmentCandidate], side: F) -> Option<PortAssignment>
where
    F: Fn(&'a ShipmentCandidate) -> Option<&'a MatchResult>,
{
    let codes = distinct(candidates.iter().filter_map(&side).map(|m| m.code.as_str()));
    let names = distinct(candidates.iter().filter_map(&side).map(|m| m.name.as_str()));

    codes.first().map(|code| PortAssignment {
        code: code.to_string(),
        name: names.join(NAME_SEPARATOR),
    })
}

pub fn aggregate(candidates: &[ShipmentCandidate]) -> AggregatedShipment {
    let cargo: Vec<&str> = candidates
        .iter()
        .filter_map(|c| c.cargo_text.as_deref())
        .collect();

    let cargo_cbm_text = cargo
        .iter()
        .find(|text| text.to_lowercase().contains("cbm"))
        .map(|text| text.to_string());

    let cargo_weight_text = cargo
        .iter()
        .find(|text| {
            let lower = text.to_lowercase();
            ["kg", "rt", "mt"].iter().any(|unit| lower.contains(unit))
        })
        .map(|text| text.to_string());

    AggregatedShipment {
        origin: combine(candidates, |c| c.origin.as_ref()),
        destination: combine(candidates, |c| c.destination.as_ref()),
        cargo_cbm_text,
        cargo_weight_text,
    }
}

/// Parses the body and returns the aggregated shipment, or `None` when the
/// email should be handled as a single shipment.
pub fn resolve(body: &str, matcher: &PortMatcher) -> Option<AggregatedShipment> {
    if !is_multi_shipment(body) {
        return None;
    }

    let candidates = parse_shipments(body, matcher);
    tracing::debug!("Parsed {} shipment legs", candidates.len());

    if candidates.is_empty() || !should_aggregate(&candidates) {
        return None;
    }
    Some(aggregate(&candidates))
}
