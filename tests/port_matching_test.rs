use freight_etl::core::port_matcher::MatchStrategy;
use freight_etl::domain::model::{Email, RawExtraction};
use freight_etl::{PortMatcher, PostProcessor, ReferenceIndex};
use std::sync::Arc;

fn index() -> Arc<ReferenceIndex> {
    let path = format!(
        "{}/tests/fixtures/port_codes_reference.json",
        env!("CARGO_MANIFEST_DIR")
    );
    Arc::new(ReferenceIndex::from_file(path).unwrap())
}

#[test]
fn test_every_reference_name_resolves_to_its_code() {
    let index = index();
    let matcher = PortMatcher::new(Arc::clone(&index));

    for entry in index.entries() {
        let result = matcher.match_port(Some(&entry.name)).unwrap();
        assert_eq!(result.code, entry.code, "name '{}'", entry.name);
    }
}

#[test]
fn test_every_code_resolves_to_canonical_name() {
    let index = index();
    let matcher = PortMatcher::new(Arc::clone(&index));

    for code in index.codes() {
        let (result, strategy) = matcher
            .match_with_strategy(Some(&code.to_lowercase()))
            .unwrap();
        assert_eq!(strategy, MatchStrategy::ExactCode);
        assert_eq!(&result.code, code);
        assert_eq!(Some(result.name.as_str()), index.canonical_name(code));
    }
}

#[test]
fn test_matching_is_deterministic() {
    let matcher = PortMatcher::new(index());
    let inputs = ["Long", "shanghai port", "ICD", "MAA", "jnpt port area", "nowhere"];

    for input in inputs {
        let first = matcher.match_port(Some(input));
        for _ in 0..5 {
            assert_eq!(matcher.match_port(Some(input)), first, "input '{}'", input);
        }
    }
}

#[test]
fn test_all_absent_extraction_still_yields_a_record() {
    let processor = PostProcessor::new(index());
    let email = Email {
        id: "EMAIL_777".to_string(),
        subject: String::new(),
        body: String::new(),
    };

    let outcome = processor.process(RawExtraction::default(), &email);
    assert!(!outcome.is_fallback());

    let record = outcome.into_record();
    assert_eq!(record.id, "EMAIL_777");
    assert_eq!(record.origin_port_code, None);
    assert_eq!(record.incoterm.as_str(), "FOB");
    assert!(!record.is_dangerous);
}
