//! Scores pipeline output against a hand-labelled ground truth file.

use crate::core::numeric::round2;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;

pub const DEFAULT_MAX_MISMATCHES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Flag,
}

pub const EVALUATED_FIELDS: [(&str, FieldKind); 9] = [
    ("product_line", FieldKind::Text),
    ("origin_port_code", FieldKind::Text),
    ("origin_port_name", FieldKind::Text),
    ("destination_port_code", FieldKind::Text),
    ("destination_port_name", FieldKind::Text),
    ("incoterm", FieldKind::Text),
    ("cargo_weight_kg", FieldKind::Number),
    ("cargo_cbm", FieldKind::Number),
    ("is_dangerous", FieldKind::Flag),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldScore {
    pub field: String,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Mismatch {
    pub id: String,
    pub field: String,
    pub predicted: Value,
    pub expected: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationReport {
    pub fields: Vec<FieldScore>,
    pub overall_accuracy: f64,
    pub total_correct: usize,
    pub total_fields: usize,
    pub total_mismatches: usize,
    pub mismatches: Vec<Mismatch>,
}

fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string().trim().to_lowercase(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// 兩邊都缺值視為相等，只有一邊缺值視為不相等
pub fn compare_field(predicted: Option<&Value>, expected: Option<&Value>, kind: FieldKind) -> bool {
    let (predicted, expected) = match (present(predicted), present(expected)) {
        (None, None) => return true,
        (Some(p), Some(e)) => (p, e),
        _ => return false,
    };

    match kind {
        FieldKind::Text => as_text(predicted) == as_text(expected),
        FieldKind::Number => match (as_number(predicted), as_number(expected)) {
            (Some(p), Some(e)) => round2(p) == round2(e),
            _ => false,
        },
        FieldKind::Flag => truthy(predicted) == truthy(expected),
    }
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    max_mismatches: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MISMATCHES)
    }
}

impl Evaluator {
    pub fn new(max_mismatches: usize) -> Self {
        Self { max_mismatches }
    }

    pub fn evaluate(&self, predictions: &[Value], ground_truth: &[Value]) -> EvaluationReport {
        let truth: HashMap<&str, &Value> = ground_truth
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_str).map(|id| (id, item)))
            .collect();

        let mut correct = [0usize; EVALUATED_FIELDS.len()];
        let mut total = [0usize; EVALUATED_FIELDS.len()];
        let mut mismatches = Vec::new();
        let mut total_mismatches = 0;

        for prediction in predictions {
            let Some(id) = prediction.get("id").and_then(Value::as_str) else {
                tracing::warn!("Skipping prediction without an id");
                continue;
            };
            let Some(expected) = truth.get(id) else {
                tracing::debug!("No ground truth for {}, skipping", id);
                continue;
            };

            for (i, (field, kind)) in EVALUATED_FIELDS.iter().enumerate() {
                total[i] += 1;
                let p = prediction.get(*field);
                let e = expected.get(*field);

                if compare_field(p, e, *kind) {
                    correct[i] += 1;
                    continue;
                }

                total_mismatches += 1;
                if mismatches.len() < self.max_mismatches {
                    mismatches.push(Mismatch {
                        id: id.to_string(),
                        field: field.to_string(),
                        predicted: p.cloned().unwrap_or(Value::Null),
                        expected: e.cloned().unwrap_or(Value::Null),
                    });
                }
            }
        }

        let fields = EVALUATED_FIELDS
            .iter()
            .enumerate()
            .map(|(i, (field, _))| FieldScore {
                field: field.to_string(),
                correct: correct[i],
                total: total[i],
                accuracy: accuracy(correct[i], total[i]),
            })
            .collect();

        let total_correct = correct.iter().sum();
        let total_fields = total.iter().sum();

        EvaluationReport {
            fields,
            overall_accuracy: accuracy(total_correct, total_fields),
            total_correct,
            total_fields,
            total_mismatches,
            mismatches,
        }
    }
}

impl EvaluationReport {
    pub fn render(&self) -> String {
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);
        let mut out = String::new();

        let _ = writeln!(out, "{}\nEVALUATION RESULTS\n{}", rule, rule);
        let _ = writeln!(out, "\nOVERALL ACCURACY: {:.2}%", self.overall_accuracy);
        let _ = writeln!(
            out,
            "({}/{} fields correct)\n",
            self.total_correct, self.total_fields
        );
        let _ = writeln!(out, "{}\nPER-FIELD ACCURACY:\n{}", thin, thin);

        for score in &self.fields {
            let status = if score.accuracy == 100.0 {
                "✓"
            } else if score.accuracy < 80.0 {
                "✗"
            } else {
                "~"
            };
            let _ = writeln!(
                out,
                "{} {:30}: {:6.2}% ({}/{})",
                status, score.field, score.accuracy, score.correct, score.total
            );
        }
        let _ = writeln!(out, "{}", rule);

        if !self.mismatches.is_empty() {
            let _ = writeln!(
                out,
                "\nSample Errors (showing first {} of {}):\n{}",
                self.mismatches.len(),
                self.total_mismatches,
                thin
            );
            for mismatch in &self.mismatches {
                let _ = writeln!(out, "{:15} | {:25}", mismatch.id, mismatch.field);
                let _ = writeln!(out, "  Predicted: {}", mismatch.predicted);
                let _ = writeln!(out, "  Expected:  {}\n", mismatch.expected);
            }
        }

        out
    }
}
