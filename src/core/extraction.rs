//! Adapters around the external extraction step.
//!
//! The model call itself lives outside this crate. `RecordedExtractor` serves
//! output captured ahead of time and `RetryingExtractor` wraps any extractor in
//! a bounded exponential backoff.

use crate::domain::model::{Email, RawExtraction};
use crate::domain::ports::Extractor;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RecordedExtractor {
    outputs: HashMap<String, RawExtraction>,
}

impl RecordedExtractor {
    pub fn new(outputs: HashMap<String, RawExtraction>) -> Self {
        Self { outputs }
    }

    /// 支援兩種格式：帶 `id` 的物件陣列，或以 id 為 key 的物件
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(data)?;
        let mut outputs = HashMap::new();

        match value {
            serde_json::Value::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    let Some(id) = item.get("id").and_then(|v| v.as_str()).map(str::to_string)
                    else {
                        tracing::warn!("Skipping recorded extraction #{} without an id", i);
                        continue;
                    };
                    outputs.insert(id.clone(), lenient_extraction(&id, item));
                }
            }
            serde_json::Value::Object(map) => {
                for (id, item) in map {
                    let raw = lenient_extraction(&id, item);
                    outputs.insert(id, raw);
                }
            }
            other => {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "Recorded extractions must be a JSON array or object, got {}",
                        json_type(&other)
                    ),
                })
            }
        }

        tracing::debug!("Loaded {} recorded extractions", outputs.len());
        Ok(Self { outputs })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json_slice(&data)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outputs.contains_key(id)
    }
}

// 單筆格式錯誤時退回全部為空的抽取結果
fn lenient_extraction(id: &str, value: serde_json::Value) -> RawExtraction {
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!("Recorded extraction for {} is malformed ({}), using empty fields", id, e);
        RawExtraction::default()
    })
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[async_trait]
impl Extractor for RecordedExtractor {
    async fn extract(&self, email: &Email) -> Result<RawExtraction> {
        self.outputs
            .get(&email.id)
            .cloned()
            .ok_or_else(|| EtlError::ExtractionError {
                id: email.id.clone(),
                message: "no recorded extraction for this email".to_string(),
                retryable: false,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt` plus jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        if self.max_jitter.is_zero() {
            return backoff;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64);
        backoff + Duration::from_millis(jitter_ms)
    }
}

pub struct RetryingExtractor<E: Extractor> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Extractor> RetryingExtractor<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<E: Extractor> Extractor for RetryingExtractor<E> {
    async fn extract(&self, email: &Email) -> Result<RawExtraction> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.inner.extract(email).await {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "Retry {}/{} for {} after {:?}: {}",
                        attempt + 1,
                        max_attempts,
                        email.id,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!("Extraction for {} failed after {} attempts", email.id, max_attempts);
                    }
                    return Err(e);
                }
            }
        }
    }
}
