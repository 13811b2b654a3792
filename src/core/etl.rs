use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        tracing::info!("📥 Extracting emails...");
        let jobs = self.pipeline.extract().await?;
        let failed = jobs.iter().filter(|job| job.extraction.is_err()).count();
        tracing::info!("Extracted {} emails ({} extraction failures)", jobs.len(), failed);

        // Transform
        tracing::info!("🔄 Post-processing shipments...");
        let result = self.pipeline.transform(jobs).await?;
        tracing::info!(
            "Normalized {} records, {} fallbacks",
            result.records.len() - result.fallback_ids.len(),
            result.fallback_ids.len()
        );
        if !result.fallback_ids.is_empty() {
            tracing::warn!("⚠️ Fallback records: {}", result.fallback_ids.join(", "));
        }

        // Load
        tracing::info!("💾 Writing output...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!(
            "✅ Output saved to: {} ({:.2}s)",
            output_path,
            started.elapsed().as_secs_f64()
        );

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Email, EmailJob, ShipmentRecord, TransformResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPipeline {
        stages: AtomicUsize,
    }

    #[async_trait]
    impl Pipeline for CountingPipeline {
        async fn extract(&self) -> Result<Vec<EmailJob>> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            Ok(vec![EmailJob {
                email: Email {
                    id: "EMAIL_001".to_string(),
                    subject: String::new(),
                    body: String::new(),
                },
                extraction: Err("offline".to_string()),
            }])
        }

        async fn transform(&self, jobs: Vec<EmailJob>) -> Result<TransformResult> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            let records: Vec<ShipmentRecord> = jobs
                .iter()
                .map(|job| ShipmentRecord::fallback(&job.email.id))
                .collect();
            Ok(TransformResult {
                fallback_ids: records.iter().map(|r| r.id.clone()).collect(),
                json_output: String::new(),
                csv_output: String::new(),
                records,
            })
        }

        async fn load(&self, result: TransformResult) -> Result<String> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            Ok(format!("out/{}", result.records.len()))
        }
    }

    #[tokio::test]
    async fn test_run_executes_all_stages() {
        let engine = EtlEngine::new(CountingPipeline::default());
        let output = engine.run().await.unwrap();
        assert_eq!(output, "out/1");
        assert_eq!(engine.pipeline().stages.load(Ordering::SeqCst), 3);
    }
}
