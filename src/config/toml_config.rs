use crate::core::extraction::RetryPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub reference_file: String,
    pub emails_file: String,
    pub extractions_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub max_records: Option<usize>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
    pub request_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，找不到時保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("source.reference_file", &self.source.reference_file)?;
        validation::validate_path("source.emails_file", &self.source.emails_file)?;
        validation::validate_path("source.extractions_file", &self.source.extractions_file)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(workers) = self.transform.workers {
            validation::validate_range("transform.workers", workers, 1, 64)?;
        }
        if let Some(attempts) = self.extract.max_attempts {
            validation::validate_range("extract.max_attempts", attempts, 1, 10)?;
        }
        if let Some(max) = self.extract.max_records {
            validation::validate_positive_number("extract.max_records", max, 1)?;
        }

        if let Some(format) = self.log_format() {
            if format != "json" && format != "text" {
                return Err(EtlError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: json, text".to_string(),
                });
            }
        }

        Ok(())
    }

    /// 取得輸出路徑
    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    /// 取得平行處理的 worker 數
    pub fn workers(&self) -> usize {
        self.transform.workers.unwrap_or(4)
    }

    /// 取得最大記錄數
    pub fn max_records(&self) -> Option<usize> {
        self.extract.max_records
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_format.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn reference_file(&self) -> &str {
        &self.source.reference_file
    }

    fn emails_file(&self) -> &str {
        &self.source.emails_file
    }

    fn extractions_file(&self) -> &str {
        &self.source.extractions_file
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn workers(&self) -> usize {
        self.workers()
    }

    fn max_records(&self) -> Option<usize> {
        self.max_records()
    }

    fn request_interval(&self) -> Duration {
        Duration::from_millis(self.extract.request_interval_ms.unwrap_or(0))
    }

    fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.extract.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: self
                .extract
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            max_jitter: self
                .extract
                .max_jitter_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_jitter),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
