use crate::core::numeric::round2;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_negative, validate_port_code};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 港口參考資料的一筆記錄；同一個 code 可以有多個名稱變體
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortReferenceEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

// null 與缺欄位一樣視為空字串，交給索引建立時回報
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PortReferenceEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// `name` is always one of the registered variations for `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerousGoodsMention {
    Yes,
    No,
    NotMentioned,
}

impl DangerousGoodsMention {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("YES") => DangerousGoodsMention::Yes,
            Some("NO") => DangerousGoodsMention::No,
            _ => DangerousGoodsMention::NotMentioned,
        }
    }
}

/// 抽取模型輸出的原始欄位，全部可為空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    #[serde(default, deserialize_with = "lenient_text")]
    pub origin_port: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub destination_port: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub incoterm: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cargo_weight_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cargo_cbm_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dangerous_goods_mentioned: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_import_to_india: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_export_from_india: Option<bool>,
}

impl RawExtraction {
    pub fn dangerous_goods(&self) -> DangerousGoodsMention {
        DangerousGoodsMention::parse(self.dangerous_goods_mentioned.as_deref())
    }
}

// 模型有時把數字直接輸出成 JSON number，統一轉成文字
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

// 方向提示可能是 "true"、"yes" 或 0/1；無法辨識時當作沒有提示
fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// One email together with whatever the extraction step produced for it.
#[derive(Debug, Clone)]
pub struct EmailJob {
    pub email: Email,
    pub extraction: std::result::Result<RawExtraction, String>,
}

/// 多段運輸郵件中的一段
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentCandidate {
    pub origin: Option<MatchResult>,
    pub destination: Option<MatchResult>,
    pub cargo_text: Option<String>,
}

/// Port fields as they end up on the record. For aggregated emails `name`
/// is the slash-joined list of distinct names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAssignment {
    pub code: String,
    pub name: String,
}

impl From<MatchResult> for PortAssignment {
    fn from(m: MatchResult) -> Self {
        Self {
            code: m.code,
            name: m.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedShipment {
    pub origin: Option<PortAssignment>,
    pub destination: Option<PortAssignment>,
    pub cargo_cbm_text: Option<String>,
    pub cargo_weight_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductLine {
    #[default]
    #[serde(rename = "pl_sea_import_lcl")]
    SeaImportLcl,
    #[serde(rename = "pl_sea_export_lcl")]
    SeaExportLcl,
}

impl ProductLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductLine::SeaImportLcl => "pl_sea_import_lcl",
            ProductLine::SeaExportLcl => "pl_sea_export_lcl",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Incoterm {
    #[default]
    Fob,
    Cif,
    Cfr,
    Exw,
    Ddp,
    Dap,
    Fca,
    Cpt,
    Cip,
    Dpu,
}

impl Incoterm {
    pub const ALL: [Incoterm; 10] = [
        Incoterm::Fob,
        Incoterm::Cif,
        Incoterm::Cfr,
        Incoterm::Exw,
        Incoterm::Ddp,
        Incoterm::Dap,
        Incoterm::Fca,
        Incoterm::Cpt,
        Incoterm::Cip,
        Incoterm::Dpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Incoterm::Fob => "FOB",
            Incoterm::Cif => "CIF",
            Incoterm::Cfr => "CFR",
            Incoterm::Exw => "EXW",
            Incoterm::Ddp => "DDP",
            Incoterm::Dap => "DAP",
            Incoterm::Fca => "FCA",
            Incoterm::Cpt => "CPT",
            Incoterm::Cip => "CIP",
            Incoterm::Dpu => "DPU",
        }
    }
}

impl FromStr for Incoterm {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Incoterm::ALL
            .iter()
            .copied()
            .find(|term| term.as_str() == s)
            .ok_or_else(|| EtlError::ValidationError {
                field: "incoterm".to_string(),
                message: format!("Unknown incoterm: {}", s),
            })
    }
}

impl fmt::Display for Incoterm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 最終輸出記錄，序列化後是以欄位名稱為 key 的平面物件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub id: String,
    pub product_line: ProductLine,
    pub origin_port_code: Option<String>,
    pub origin_port_name: Option<String>,
    pub destination_port_code: Option<String>,
    pub destination_port_name: Option<String>,
    pub incoterm: Incoterm,
    pub cargo_weight_kg: Option<f64>,
    pub cargo_cbm: Option<f64>,
    pub is_dangerous: bool,
}

impl ShipmentRecord {
    /// The record emitted when an email cannot be reduced to a valid record.
    pub fn fallback(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_line: ProductLine::SeaImportLcl,
            origin_port_code: None,
            origin_port_name: None,
            destination_port_code: None,
            destination_port_name: None,
            incoterm: Incoterm::Fob,
            cargo_weight_kg: None,
            cargo_cbm: None,
            is_dangerous: false,
        }
    }

    /// 四捨五入數值欄位並檢查所有不變量
    pub fn validated(mut self) -> Result<Self> {
        self.cargo_weight_kg = self.cargo_weight_kg.map(round2);
        self.cargo_cbm = self.cargo_cbm.map(round2);

        validate_port_code("origin_port_code", self.origin_port_code.as_deref())?;
        validate_port_code("destination_port_code", self.destination_port_code.as_deref())?;
        validate_non_negative("cargo_weight_kg", self.cargo_weight_kg)?;
        validate_non_negative("cargo_cbm", self.cargo_cbm)?;

        Ok(self)
    }
}

/// Result of post-processing one email: either the normalized record or the
/// fallback record together with the reason it was substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Normalized(ShipmentRecord),
    Fallback { record: ShipmentRecord, reason: String },
}

impl ProcessOutcome {
    pub fn record(&self) -> &ShipmentRecord {
        match self {
            ProcessOutcome::Normalized(record) => record,
            ProcessOutcome::Fallback { record, .. } => record,
        }
    }

    pub fn into_record(self) -> ShipmentRecord {
        match self {
            ProcessOutcome::Normalized(record) => record,
            ProcessOutcome::Fallback { record, .. } => record,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ProcessOutcome::Fallback { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<ShipmentRecord>,
    pub fallback_ids: Vec<String>,
    pub json_output: String,
    pub csv_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_extraction_accepts_numbers_and_missing_fields() {
        let raw: RawExtraction = serde_json::from_value(serde_json::json!({
            "origin_port": "Shanghai",
            "cargo_weight_text": 1980,
            "incoterm": null,
            "is_import_to_india": true
        }))
        .unwrap();

        assert_eq!(raw.origin_port.as_deref(), Some("Shanghai"));
        assert_eq!(raw.cargo_weight_text.as_deref(), Some("1980"));
        assert_eq!(raw.incoterm, None);
        assert_eq!(raw.destination_port, None);
        assert_eq!(raw.is_import_to_india, Some(true));
        assert_eq!(raw.dangerous_goods(), DangerousGoodsMention::NotMentioned);
    }

    #[test]
    fn test_direction_hints_are_lenient() {
        let raw: RawExtraction = serde_json::from_value(serde_json::json!({
            "origin_port": "Shanghai",
            "destination_port": "Chennai",
            "cargo_weight_text": "500 kg",
            "is_import_to_india": "true",
            "is_export_from_india": 0
        }))
        .unwrap();

        assert_eq!(raw.origin_port.as_deref(), Some("Shanghai"));
        assert_eq!(raw.destination_port.as_deref(), Some("Chennai"));
        assert_eq!(raw.cargo_weight_text.as_deref(), Some("500 kg"));
        assert_eq!(raw.is_import_to_india, Some(true));
        assert_eq!(raw.is_export_from_india, Some(false));

        let raw: RawExtraction = serde_json::from_value(serde_json::json!({
            "is_import_to_india": "No",
            "is_export_from_india": "maybe"
        }))
        .unwrap();
        assert_eq!(raw.is_import_to_india, Some(false));
        assert_eq!(raw.is_export_from_india, None);
    }

    #[test]
    fn test_reference_entry_null_fields_read_as_empty() {
        let entry: PortReferenceEntry =
            serde_json::from_str(r#"{"code": null, "name": "Chennai"}"#).unwrap();
        assert_eq!(entry.code, "");
        assert_eq!(entry.name, "Chennai");
    }

    #[test]
    fn test_record_serializes_as_flat_object() {
        let record = ShipmentRecord {
            id: "EMAIL_001".to_string(),
            product_line: ProductLine::SeaExportLcl,
            origin_port_code: Some("INMAA".to_string()),
            origin_port_name: Some("Chennai".to_string()),
            destination_port_code: None,
            destination_port_name: None,
            incoterm: Incoterm::Cif,
            cargo_weight_kg: Some(1980.0),
            cargo_cbm: None,
            is_dangerous: false,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["product_line"], "pl_sea_export_lcl");
        assert_eq!(value["incoterm"], "CIF");
        assert_eq!(value["origin_port_code"], "INMAA");
        assert!(value["destination_port_code"].is_null());
        assert_eq!(value["cargo_weight_kg"], 1980.0);
    }

    #[test]
    fn test_validated_rounds_and_rejects_bad_codes() {
        let mut record = ShipmentRecord::fallback("EMAIL_002");
        record.cargo_cbm = Some(3.14159);
        let record = record.validated().unwrap();
        assert_eq!(record.cargo_cbm, Some(3.14));

        let mut bad = ShipmentRecord::fallback("EMAIL_003");
        bad.destination_port_code = Some("INMAAX".to_string());
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_incoterm_from_str() {
        assert_eq!("DPU".parse::<Incoterm>().unwrap(), Incoterm::Dpu);
        assert!("fob".parse::<Incoterm>().is_err());
    }
}
