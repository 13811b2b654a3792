use crate::core::extraction::{RecordedExtractor, RetryingExtractor};
use crate::core::postprocess::{self, PostProcessor};
use crate::core::reference::ReferenceIndex;
use crate::core::{ConfigProvider, Extractor, Pipeline, Storage};
use crate::domain::model::{Email, EmailJob, ProcessOutcome, ShipmentRecord, TransformResult};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const JSON_OUTPUT: &str = "shipments.json";
pub const CSV_OUTPUT: &str = "shipments.csv";
pub const SUMMARY_OUTPUT: &str = "run_summary.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub normalized_records: usize,
    pub fallback_records: usize,
    pub fallback_ids: Vec<String>,
}

pub struct ShipmentPipeline<S: Storage, C: ConfigProvider, X: Extractor> {
    storage: S,
    config: C,
    extractor: X,
    processor: Arc<PostProcessor>,
}

impl<S: Storage, C: ConfigProvider, X: Extractor> ShipmentPipeline<S, C, X> {
    pub fn new(storage: S, config: C, extractor: X, processor: Arc<PostProcessor>) -> Self {
        Self {
            storage,
            config,
            extractor,
            processor,
        }
    }

    pub fn processor(&self) -> &PostProcessor {
        &self.processor
    }
}

impl<S: Storage, C: ConfigProvider>
    ShipmentPipeline<S, C, RetryingExtractor<RecordedExtractor>>
{
    /// 啟動時建立參考索引並載入已記錄的抽取結果
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        tracing::info!("📚 Loading port reference from: {}", config.reference_file());
        let index = ReferenceIndex::from_file(config.reference_file())?;
        tracing::info!("Reference index ready: {} entries, {} codes", index.len(), index.codes().len());

        tracing::info!("📥 Loading recorded extractions from: {}", config.extractions_file());
        let recorded = RecordedExtractor::from_file(config.extractions_file())?;
        let extractor = RetryingExtractor::new(recorded, config.retry_policy());

        let processor = Arc::new(PostProcessor::new(Arc::new(index)));
        Ok(Self::new(storage, config, extractor, processor))
    }
}

fn process_job(processor: &PostProcessor, job: EmailJob) -> ProcessOutcome {
    match job.extraction {
        Ok(raw) => processor.process(raw, &job.email),
        Err(reason) => postprocess::fallback(&job.email.id, reason),
    }
}

fn to_csv(records: &[ShipmentRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush CSV output: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, X: Extractor> Pipeline for ShipmentPipeline<S, C, X> {
    async fn extract(&self) -> Result<Vec<EmailJob>> {
        tracing::debug!("Reading emails from: {}", self.config.emails_file());
        let data = tokio::fs::read(self.config.emails_file()).await?;
        let mut emails: Vec<Email> = serde_json::from_slice(&data)?;

        if let Some(max) = self.config.max_records() {
            emails.truncate(max);
        }

        let total = emails.len();
        let interval = self.config.request_interval();
        let mut jobs = Vec::with_capacity(total);

        // 抽取呼叫依序進行，呼叫之間保持間隔
        for (i, email) in emails.into_iter().enumerate() {
            tracing::info!("Processing {}/{}: {}", i + 1, total, email.id);

            let extraction = self.extractor.extract(&email).await.map_err(|e| {
                tracing::error!("✗ Error extracting {}: {}", email.id, e);
                e.to_string()
            });
            jobs.push(EmailJob { email, extraction });

            if !interval.is_zero() && i + 1 < total {
                tracing::debug!("Rate limiting: waiting {:?} before next request", interval);
                tokio::time::sleep(interval).await;
            }
        }

        Ok(jobs)
    }

    async fn transform(&self, jobs: Vec<EmailJob>) -> Result<TransformResult> {
        let workers = self.config.workers().max(1);
        let chunk_size = jobs.len().div_ceil(workers).max(1);

        let mut chunks: Vec<Vec<EmailJob>> = Vec::new();
        let mut iter = jobs.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(chunk_size).collect());
        }
        tracing::debug!("Post-processing {} chunks on {} workers", chunks.len(), workers);

        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                let processor = Arc::clone(&self.processor);
                tokio::task::spawn_blocking(move || {
                    chunk
                        .into_iter()
                        .map(|job| process_job(&processor, job))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        // 依輸入順序重組
        let mut records = Vec::new();
        let mut fallback_ids = Vec::new();
        for handle in handles {
            for outcome in handle.await? {
                if outcome.is_fallback() {
                    fallback_ids.push(outcome.record().id.clone());
                } else {
                    tracing::info!("✓ Successfully extracted {}", outcome.record().id);
                }
                records.push(outcome.into_record());
            }
        }

        Ok(TransformResult {
            json_output: serde_json::to_string_pretty(&records)?,
            csv_output: to_csv(&records)?,
            records,
            fallback_ids,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let formats = self.config.output_formats();
        let mut written = Vec::new();

        if formats.iter().any(|f| f == "json") {
            self.storage
                .write_file(JSON_OUTPUT, result.json_output.as_bytes())
                .await?;
            written.push(JSON_OUTPUT);
        }
        if formats.iter().any(|f| f == "csv") {
            self.storage
                .write_file(CSV_OUTPUT, result.csv_output.as_bytes())
                .await?;
            written.push(CSV_OUTPUT);
        }

        let summary = RunSummary {
            generated_at: Utc::now(),
            total_records: result.records.len(),
            normalized_records: result.records.len() - result.fallback_ids.len(),
            fallback_records: result.fallback_ids.len(),
            fallback_ids: result.fallback_ids,
        };
        let summary_json = serde_json::to_string_pretty(&summary)?;
        self.storage
            .write_file(SUMMARY_OUTPUT, summary_json.as_bytes())
            .await?;

        tracing::debug!("Wrote {:?} and {}", written, SUMMARY_OUTPUT);

        let primary = written.first().copied().unwrap_or(SUMMARY_OUTPUT);
        Ok(format!("{}/{}", self.config.output_path(), primary))
    }
}
