use crate::core::dangerous_goods;
use crate::core::multi_shipment::{self, is_indian_port};
use crate::core::numeric::{process_cbm, process_weight};
use crate::core::port_matcher::PortMatcher;
use crate::core::reference::ReferenceIndex;
use crate::domain::model::{
    DangerousGoodsMention, Email, Incoterm, PortAssignment, ProcessOutcome, ProductLine,
    RawExtraction, ShipmentRecord,
};
use std::sync::Arc;

const EMPTY_INCOTERMS: &[&str] = &["null", "none", "", "not mentioned"];

/// 將抽取結果轉成最終的出貨記錄；不會向外拋出錯誤
#[derive(Debug, Clone)]
pub struct PostProcessor {
    matcher: PortMatcher,
}

impl PostProcessor {
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self {
            matcher: PortMatcher::new(index),
        }
    }

    pub fn matcher(&self) -> &PortMatcher {
        &self.matcher
    }

    pub fn process(&self, mut raw: RawExtraction, email: &Email) -> ProcessOutcome {
        tracing::debug!("Raw extraction for {}: {:?}", email.id, raw);

        let (origin, destination) = match multi_shipment::resolve(&email.body, &self.matcher) {
            Some(aggregated) => {
                tracing::info!("{}: Aggregating multi-shipment email", email.id);
                if aggregated.cargo_cbm_text.is_some() {
                    raw.cargo_cbm_text = aggregated.cargo_cbm_text;
                }
                if aggregated.cargo_weight_text.is_some() {
                    raw.cargo_weight_text = aggregated.cargo_weight_text;
                }
                (aggregated.origin, aggregated.destination)
            }
            None => {
                if multi_shipment::is_multi_shipment(&email.body) {
                    tracing::info!(
                        "{}: Multi-shipment email not aggregated, using extracted ports",
                        email.id
                    );
                }
                (
                    self.matcher
                        .match_port(raw.origin_port.as_deref())
                        .map(PortAssignment::from),
                    self.matcher
                        .match_port(raw.destination_port.as_deref())
                        .map(PortAssignment::from),
                )
            }
        };

        tracing::debug!(
            "Port matching for {} - Origin: {:?}, Dest: {:?}",
            email.id,
            origin,
            destination
        );

        let product_line = decide_product_line(
            origin.as_ref().map(|p| p.code.as_str()),
            destination.as_ref().map(|p| p.code.as_str()),
            raw.is_import_to_india,
            raw.is_export_from_india,
        );
        tracing::debug!("Product line for {}: {}", email.id, product_line);

        let record = ShipmentRecord {
            id: email.id.clone(),
            product_line,
            origin_port_code: origin.as_ref().map(|p| p.code.clone()),
            origin_port_name: origin.map(|p| p.name),
            destination_port_code: destination.as_ref().map(|p| p.code.clone()),
            destination_port_name: destination.map(|p| p.name),
            incoterm: normalize_incoterm(raw.incoterm.as_deref()),
            cargo_weight_kg: process_weight(raw.cargo_weight_text.as_deref()),
            cargo_cbm: process_cbm(raw.cargo_cbm_text.as_deref()),
            is_dangerous: resolve_dangerous(raw.dangerous_goods(), email),
        };

        match record.validated() {
            Ok(record) => ProcessOutcome::Normalized(record),
            Err(e) => fallback(&email.id, e.to_string()),
        }
    }
}

pub fn fallback(id: &str, reason: impl Into<String>) -> ProcessOutcome {
    let reason = reason.into();
    tracing::warn!("Creating fallback record for {}: {}", id, reason);
    ProcessOutcome::Fallback {
        record: ShipmentRecord::fallback(id),
        reason,
    }
}

/// 目的港在印度為進口，否則起運港在印度為出口，最後才參考模型的提示
pub fn decide_product_line(
    origin_code: Option<&str>,
    destination_code: Option<&str>,
    import_hint: Option<bool>,
    export_hint: Option<bool>,
) -> ProductLine {
    if destination_code.is_some_and(is_indian_port) {
        return ProductLine::SeaImportLcl;
    }
    if origin_code.is_some_and(is_indian_port) {
        return ProductLine::SeaExportLcl;
    }

    // 兩個提示都沒有時預設為進口
    match (export_hint, import_hint) {
        (Some(true), _) => ProductLine::SeaExportLcl,
        (_, Some(true)) => ProductLine::SeaImportLcl,
        _ => ProductLine::SeaImportLcl,
    }
}

pub fn normalize_incoterm(text: Option<&str>) -> Incoterm {
    let Some(text) = text else {
        return Incoterm::default();
    };
    if EMPTY_INCOTERMS.contains(&text.to_lowercase().as_str()) {
        return Incoterm::default();
    }
    text.trim().to_uppercase().parse().unwrap_or_default()
}

pub fn resolve_dangerous(mention: DangerousGoodsMention, email: &Email) -> bool {
    match mention {
        DangerousGoodsMention::Yes => true,
        DangerousGoodsMention::No => false,
        DangerousGoodsMention::NotMentioned => {
            let full_text = format!("{} {}", email.subject, email.body);
            dangerous_goods::detect(Some(&full_text))
        }
    }
}
