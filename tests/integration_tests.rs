use freight_etl::core::evaluate::Evaluator;
use freight_etl::core::pipeline::{CSV_OUTPUT, JSON_OUTPUT, SUMMARY_OUTPUT};
use freight_etl::utils::error::ErrorSeverity;
use freight_etl::{CliConfig, EtlEngine, EtlError, LocalStorage, ShipmentPipeline};
use serde_json::{json, Value};
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn cli_config(output_path: &str) -> CliConfig {
    CliConfig {
        reference: fixture("port_codes_reference.json"),
        emails: fixture("emails_input.json"),
        extractions: fixture("extractions.json"),
        output_path: output_path.to_string(),
        output_formats: vec!["json".to_string(), "csv".to_string()],
        workers: 2,
        max_records: None,
        max_attempts: 3,
        base_delay_ms: 0,
        request_interval_ms: 0,
        verbose: false,
    }
}

fn expected_records() -> Value {
    json!([
        {
            "id": "EMAIL_001",
            "product_line": "pl_sea_import_lcl",
            "origin_port_code": "CNSHA",
            "origin_port_name": "Shanghai",
            "destination_port_code": "INMAA",
            "destination_port_name": "Chennai",
            "incoterm": "FOB",
            "cargo_weight_kg": 500.0,
            "cargo_cbm": 3.8,
            "is_dangerous": false
        },
        {
            "id": "EMAIL_002",
            "product_line": "pl_sea_export_lcl",
            "origin_port_code": "INNSA",
            "origin_port_name": "Nhava Sheva",
            "destination_port_code": "SGSIN",
            "destination_port_name": "Singapore",
            "incoterm": "CIF",
            "cargo_weight_kg": 1200.0,
            "cargo_cbm": null,
            "is_dangerous": true
        },
        {
            "id": "EMAIL_003",
            "product_line": "pl_sea_import_lcl",
            "origin_port_code": "CNSHA",
            "origin_port_name": "Shanghai / Hong Kong",
            "destination_port_code": "INMAA",
            "destination_port_name": "Chennai ICD",
            "incoterm": "FOB",
            "cargo_weight_kg": 300.0,
            "cargo_cbm": 2.5,
            "is_dangerous": false
        },
        {
            "id": "EMAIL_004",
            "product_line": "pl_sea_import_lcl",
            "origin_port_code": null,
            "origin_port_name": null,
            "destination_port_code": null,
            "destination_port_name": null,
            "incoterm": "FOB",
            "cargo_weight_kg": null,
            "cargo_cbm": null,
            "is_dangerous": false
        },
        {
            "id": "EMAIL_005",
            "product_line": "pl_sea_import_lcl",
            "origin_port_code": null,
            "origin_port_name": null,
            "destination_port_code": "USLAX",
            "destination_port_name": "Los Angeles",
            "incoterm": "FOB",
            "cargo_weight_kg": null,
            "cargo_cbm": null,
            "is_dangerous": false
        }
    ])
}

#[tokio::test]
async fn test_end_to_end_freight_run() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = ShipmentPipeline::from_config(storage, cli_config(&output_path)).unwrap();
    let engine = EtlEngine::new(pipeline);

    let result = engine.run().await.unwrap();
    assert!(result.ends_with(JSON_OUTPUT));

    let output_dir = temp_dir.path();
    let shipments: Value =
        serde_json::from_slice(&std::fs::read(output_dir.join(JSON_OUTPUT)).unwrap()).unwrap();
    assert_eq!(shipments, expected_records());

    let csv = std::fs::read_to_string(output_dir.join(CSV_OUTPUT)).unwrap();
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.contains("EMAIL_003,pl_sea_import_lcl,CNSHA,Shanghai / Hong Kong,INMAA,Chennai ICD,FOB,300.0,2.5,false"));

    let summary: Value =
        serde_json::from_slice(&std::fs::read(output_dir.join(SUMMARY_OUTPUT)).unwrap()).unwrap();
    assert_eq!(summary["total_records"], 5);
    assert_eq!(summary["fallback_records"], 1);
    assert_eq!(summary["fallback_ids"], json!(["EMAIL_004"]));
}

#[tokio::test]
async fn test_output_scores_full_marks_against_ground_truth() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = ShipmentPipeline::from_config(storage, cli_config(&output_path)).unwrap();
    EtlEngine::new(pipeline).run().await.unwrap();

    let predictions: Vec<Value> =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join(JSON_OUTPUT)).unwrap())
            .unwrap();
    let ground_truth: Vec<Value> = serde_json::from_value(expected_records()).unwrap();

    let report = Evaluator::default().evaluate(&predictions, &ground_truth);
    assert_eq!(report.total_fields, 45);
    assert_eq!(report.overall_accuracy, 100.0);
}

#[tokio::test]
async fn test_max_records_limits_batch() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let mut config = cli_config(&output_path);
    config.max_records = Some(2);
    config.output_formats = vec!["json".to_string()];

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = ShipmentPipeline::from_config(storage, config).unwrap();
    EtlEngine::new(pipeline).run().await.unwrap();

    let shipments: Vec<Value> =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join(JSON_OUTPUT)).unwrap())
            .unwrap();
    assert_eq!(shipments.len(), 2);
    assert!(!temp_dir.path().join(CSV_OUTPUT).exists());
}

#[test]
fn test_malformed_reference_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let reference = temp_dir.path().join("reference.json");
    std::fs::write(
        &reference,
        r#"[{"code": "INMAA", "name": "Chennai"}, {"code": "", "name": "Nowhere"}]"#,
    )
    .unwrap();

    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let mut config = cli_config(&output_path);
    config.reference = reference.to_str().unwrap().to_string();

    let err = match ShipmentPipeline::from_config(LocalStorage::new(output_path), config) {
        Ok(_) => panic!("malformed reference should not build a pipeline"),
        Err(e) => e,
    };
    assert!(matches!(err, EtlError::MalformedReferenceEntry { index: 1, .. }));
    assert_eq!(err.severity(), ErrorSeverity::Critical);
}
