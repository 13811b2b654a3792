use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const SUPPORTED_OUTPUT_FORMATS: &[&str] = &["json", "csv"];

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Err(EtlError::MissingConfigError {
            field: field_name.to_string(),
        });
    }

    let allowed: HashSet<&str> = SUPPORTED_OUTPUT_FORMATS.iter().copied().collect();
    for format in formats {
        if !allowed.contains(format.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    SUPPORTED_OUTPUT_FORMATS.join(", ")
                ),
            });
        }
    }
    Ok(())
}

/// 港口代碼必須剛好是 5 個大寫英文字母
pub fn validate_port_code(field_name: &str, code: Option<&str>) -> Result<()> {
    if let Some(code) = code {
        let well_formed = code.len() == 5 && code.chars().all(|c| c.is_ascii_uppercase());
        if !well_formed {
            return Err(EtlError::ValidationError {
                field: field_name.to_string(),
                message: format!("Invalid port code format: {}", code),
            });
        }
    }
    Ok(())
}

pub fn validate_non_negative(field_name: &str, value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        if !value.is_finite() || value < 0.0 {
            return Err(EtlError::ValidationError {
                field: field_name.to_string(),
                message: format!("Must be a non-negative number, got {}", value),
            });
        }
    }
    Ok(())
}
