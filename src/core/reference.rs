//! Read-only lookup tables over the port reference dataset.
//!
//! Built once at start-up and shared by reference afterwards; nothing in here
//! mutates after [`ReferenceIndex::build`] returns.

use crate::domain::model::PortReferenceEntry;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Curated abbreviations. These win over the auto-derived 3-letter suffixes.
const MANUAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("SHA", "CNSHA"),
    ("MAA", "INMAA"),
    ("HK", "HKHKG"),
    ("SIN", "SGSIN"),
    ("BLR", "INBLR"),
    ("BOM", "INNSA"),
    ("DEL", "INMAA"),
    ("TXG", "CNTXG"),
    ("BKK", "THBKK"),
    ("SUB", "IDSUB"),
    ("JED", "SAJED"),
    ("DAM", "SAJED"),
    ("RUH", "SAJED"),
    ("HYD", "INMAA"),
    ("GOA", "ITGOA"),
    ("HAM", "DEHAM"),
    ("MNL", "PHMNL"),
    ("OSA", "JPOSA"),
    ("YOK", "JPYOK"),
    ("PUS", "KRPUS"),
    ("KEL", "TWKEL"),
    ("HOU", "USHOU"),
    ("LAX", "USLAX"),
    ("SGN", "VNSGN"),
    ("CPT", "ZACPT"),
    ("LCH", "THLCH"),
    ("AMR", "TRAMR"),
    ("IZM", "TRIZM"),
    ("PKG", "MYPKG"),
    ("GZG", "CNGZG"),
    ("NSA", "CNNSA"),
    ("QIN", "CNQIN"),
    ("SZX", "CNSZX"),
    ("JEA", "AEJEA"),
    ("DAC", "BDDAC"),
    ("MUN", "INMUN"),
    ("WFD", "INWFD"),
    ("JAPAN", "JPUKB"),
    ("JPN", "JPUKB"),
];

/// A registered name variation: the normalized key plus the name exactly as
/// it appears in the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVariation {
    pub normalized: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: Vec<PortReferenceEntry>,
    /// code 依第一次出現的順序
    codes: Vec<String>,
    code_to_canonical: HashMap<String, String>,
    /// normalized name -> index into `entries` (last write wins)
    name_to_entry: HashMap<String, usize>,
    code_to_names: HashMap<String, Vec<NameVariation>>,
    abbrev_to_code: HashMap<String, String>,
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ReferenceIndex {
    /// 依輸入順序建立所有查詢表；缺少 code 或 name 的記錄直接失敗
    pub fn build(entries: Vec<PortReferenceEntry>) -> Result<Self> {
        let mut index = ReferenceIndex::default();

        for (i, entry) in entries.iter().enumerate() {
            if entry.code.trim().is_empty() {
                return Err(EtlError::MalformedReferenceEntry {
                    index: i,
                    field: "code".to_string(),
                });
            }
            if entry.name.trim().is_empty() {
                return Err(EtlError::MalformedReferenceEntry {
                    index: i,
                    field: "name".to_string(),
                });
            }

            let code = entry.code.clone();
            let key = normalize_name(&entry.name);

            if !index.code_to_canonical.contains_key(&code) {
                index.codes.push(code.clone());
                index
                    .code_to_canonical
                    .insert(code.clone(), entry.name.clone());
            }

            index.name_to_entry.insert(key.clone(), i);
            index
                .code_to_names
                .entry(code)
                .or_default()
                .push(NameVariation {
                    normalized: key,
                    name: entry.name.clone(),
                });
        }

        index.entries = entries;
        index.build_abbreviations();

        tracing::debug!(
            "Reference index built: {} entries, {} codes, {} abbreviations",
            index.entries.len(),
            index.codes.len(),
            index.abbrev_to_code.len()
        );

        Ok(index)
    }

    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let entries: Vec<PortReferenceEntry> = serde_json::from_slice(data)?;
        Self::build(entries)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json_slice(&data)
    }

    fn build_abbreviations(&mut self) {
        for code in &self.codes {
            let chars: Vec<char> = code.chars().collect();
            let abbrev: String = chars[chars.len().saturating_sub(3)..].iter().collect();
            self.abbrev_to_code
                .entry(abbrev)
                .or_insert_with(|| code.clone());
        }

        // 手動表只接受資料集中存在的 code，避免查到沒有正式名稱的代碼
        for (abbrev, code) in MANUAL_ABBREVIATIONS {
            if self.code_to_canonical.contains_key(*code) {
                self.abbrev_to_code
                    .insert(abbrev.to_string(), code.to_string());
            } else {
                tracing::debug!("Skipping abbreviation {} -> {}: code not in dataset", abbrev, code);
            }
        }
    }

    pub fn canonical_name(&self, code: &str) -> Option<&str> {
        self.code_to_canonical.get(code).map(String::as_str)
    }

    /// Looks up an already-normalized name.
    pub fn entry_for_name(&self, normalized: &str) -> Option<&PortReferenceEntry> {
        self.name_to_entry.get(normalized).map(|&i| &self.entries[i])
    }

    pub fn code_for_name(&self, normalized: &str) -> Option<&str> {
        self.entry_for_name(normalized).map(|e| e.code.as_str())
    }

    pub fn code_for_abbreviation(&self, abbrev: &str) -> Option<&str> {
        self.abbrev_to_code.get(abbrev).map(String::as_str)
    }

    pub fn variations(&self, code: &str) -> &[NameVariation] {
        self.code_to_names
            .get(code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 依資料集插入順序走訪所有 (code, 名稱變體)
    pub fn iter_variations(&self) -> impl Iterator<Item = (&str, &NameVariation)> + '_ {
        self.codes.iter().flat_map(move |code| {
            self.variations(code)
                .iter()
                .map(move |variation| (code.as_str(), variation))
        })
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn entries(&self) -> &[PortReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PortReferenceEntry> {
        vec![
            PortReferenceEntry::new("INMAA", "Chennai"),
            PortReferenceEntry::new("INMAA", "Chennai ICD"),
            PortReferenceEntry::new("CNSHA", "Shanghai"),
            PortReferenceEntry::new("XXSHA", "Other Sha"),
            PortReferenceEntry::new("INNSA", "Nhava Sheva"),
        ]
    }

    #[test]
    fn test_first_occurrence_sets_canonical_name() {
        let index = ReferenceIndex::build(sample()).unwrap();
        assert_eq!(index.canonical_name("INMAA"), Some("Chennai"));
        assert_eq!(index.variations("INMAA").len(), 2);
        assert_eq!(index.variations("INMAA")[1].name, "Chennai ICD");
        assert_eq!(index.codes(), &["INMAA", "CNSHA", "XXSHA", "INNSA"]);
    }

    #[test]
    fn test_duplicate_name_last_write_wins() {
        let entries = vec![
            PortReferenceEntry::new("AAAAA", "Twin City"),
            PortReferenceEntry::new("BBBBB", "twin city "),
        ];
        let index = ReferenceIndex::build(entries).unwrap();
        assert_eq!(index.code_for_name("twin city"), Some("BBBBB"));
        assert_eq!(index.canonical_name("AAAAA"), Some("Twin City"));
    }

    #[test]
    fn test_abbreviations_first_seen_then_manual_override() {
        let index = ReferenceIndex::build(sample()).unwrap();
        // CNSHA 先出現，且手動表也指向 CNSHA
        assert_eq!(index.code_for_abbreviation("SHA"), Some("CNSHA"));
        // BOM 手動對應到 INNSA
        assert_eq!(index.code_for_abbreviation("BOM"), Some("INNSA"));
        assert_eq!(index.code_for_abbreviation("NSA"), Some("INNSA"));
        // HK -> HKHKG is not in this dataset
        assert_eq!(index.code_for_abbreviation("HK"), None);
    }

    #[test]
    fn test_every_table_code_has_canonical_name() {
        let index = ReferenceIndex::build(sample()).unwrap();
        for code in index.abbrev_to_code.values() {
            assert!(index.canonical_name(code).is_some());
        }
        for (code, _) in index.iter_variations() {
            assert!(index.canonical_name(code).is_some());
        }
    }

    #[test]
    fn test_missing_fields_fail_fast() {
        let missing_name = vec![
            PortReferenceEntry::new("INMAA", "Chennai"),
            PortReferenceEntry::new("CNSHA", "  "),
        ];
        match ReferenceIndex::build(missing_name) {
            Err(EtlError::MalformedReferenceEntry { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "name");
            }
            other => panic!("unexpected result: {:?}", other.map(|i| i.len())),
        }

        let missing_code: Result<ReferenceIndex> =
            ReferenceIndex::from_json_slice(br#"[{"name": "Chennai"}]"#);
        assert!(matches!(
            missing_code,
            Err(EtlError::MalformedReferenceEntry { .. })
        ));

        let null_code: Result<ReferenceIndex> = ReferenceIndex::from_json_slice(
            br#"[{"code": "INMAA", "name": "Chennai"}, {"code": null, "name": "Madras"}]"#,
        );
        match null_code {
            Err(EtlError::MalformedReferenceEntry { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "code");
            }
            other => panic!("unexpected result: {:?}", other.map(|i| i.len())),
        }
    }
}
