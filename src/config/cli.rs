use crate::core::extraction::RetryPolicy;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "freight-etl")]
#[command(about = "Normalize extracted freight-quote emails into shipment records")]
pub struct CliConfig {
    #[arg(long, default_value = "./data/port_codes_reference.json")]
    pub reference: String,

    #[arg(long, default_value = "./data/emails_input.json")]
    pub emails: String,

    #[arg(long, default_value = "./data/extractions.json")]
    pub extractions: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "json")]
    pub output_formats: Vec<String>,

    #[arg(long, default_value = "4")]
    pub workers: usize,

    #[arg(long)]
    pub max_records: Option<usize>,

    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    #[arg(long, default_value = "1000")]
    pub base_delay_ms: u64,

    #[arg(long, default_value = "0", help = "Delay between extraction calls")]
    pub request_interval_ms: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn reference_file(&self) -> &str {
        &self.reference
    }

    fn emails_file(&self) -> &str {
        &self.emails
    }

    fn extractions_file(&self) -> &str {
        &self.extractions
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn max_records(&self) -> Option<usize> {
        self.max_records
    }

    fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_jitter: Duration::ZERO,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("reference", &self.reference)?;
        validation::validate_path("emails", &self.emails)?;
        validation::validate_path("extractions", &self.extractions)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_output_formats("output_formats", &self.output_formats)?;
        validation::validate_range("workers", self.workers, 1, 64)?;
        validation::validate_range("max_attempts", self.max_attempts, 1, 10)?;
        Ok(())
    }
}

/// 寫入本機目錄，必要時建立上層目錄
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}
