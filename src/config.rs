use serde::{Deserialize, Serialize};

use crate::billing::completion::CompletionFeeSchedule;

/// Main configuration for the payrun engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub completion_fees: CompletionFeeSchedule,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied when creating payroll versions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersioningConfig {
    /// Working days between processing and EFT when neither the edit nor
    /// the current version carries a value.
    #[serde(default = "default_processing_days")]
    pub processing_days_before_eft: i32,
    /// Employee count fallback.
    #[serde(default = "default_employee_count")]
    pub employee_count: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_processing_days() -> i32 {
    crate::payroll::version::DEFAULT_PROCESSING_DAYS_BEFORE_EFT
}

fn default_employee_count() -> i32 {
    crate::payroll::version::DEFAULT_EMPLOYEE_COUNT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            processing_days_before_eft: default_processing_days(),
            employee_count: default_employee_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            versioning: VersioningConfig::default(),
            completion_fees: CompletionFeeSchedule::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_versioning_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.versioning.processing_days_before_eft, 4);
        assert_eq!(config.versioning.employee_count, 0);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"logging":{"level":"debug"}}"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.versioning.processing_days_before_eft, 4);
        assert!(!config.completion_fees.rules.is_empty());
    }
}
