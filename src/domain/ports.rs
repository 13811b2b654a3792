use crate::core::extraction::RetryPolicy;
use crate::domain::model::{Email, EmailJob, RawExtraction, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn reference_file(&self) -> &str;
    fn emails_file(&self) -> &str;
    fn extractions_file(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn workers(&self) -> usize;
    fn max_records(&self) -> Option<usize>;
    fn request_interval(&self) -> Duration;
    fn retry_policy(&self) -> RetryPolicy;
}

/// 外部抽取步驟：為一封郵件產生原始欄位
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, email: &Email) -> Result<RawExtraction>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<EmailJob>>;
    async fn transform(&self, jobs: Vec<EmailJob>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
