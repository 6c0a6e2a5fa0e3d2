//! Engine configuration

use corebank_approval::ApprovalConfig;
use corebank_core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for the transaction engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Approval tiers
    #[serde(default)]
    pub approval: ApprovalConfig,

    /// A debit leaving less than this on the source publishes LOW_BALANCE
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: Decimal,

    /// Currency for accounts opened without one
    #[serde(default)]
    pub default_currency: Currency,
}

fn default_low_balance_threshold() -> Decimal {
    Decimal::new(100, 0)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval: ApprovalConfig::default(),
            low_balance_threshold: default_low_balance_threshold(),
            default_currency: Currency::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn with_low_balance_threshold(mut self, threshold: Decimal) -> Self {
        self.low_balance_threshold = threshold;
        self
    }

    pub fn with_approval(mut self, approval: ApprovalConfig) -> Self {
        self.approval = approval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.low_balance_threshold, dec!(100));
        assert_eq!(config.default_currency, Currency::Usd);
        assert_eq!(config.approval.tiers.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "low_balance_threshold": "25.50" }"#).unwrap();
        assert_eq!(config.low_balance_threshold, dec!(25.50));
        assert_eq!(config.approval, ApprovalConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "default_currency": "EUR",
                "approval": {{ "tiers": [
                    {{ "name": "auto", "min": "0", "max": "50", "decision": "auto_approve" }},
                    {{ "name": "manager", "min": "50", "decision": {{ "require_role": "manager" }} }}
                ] }}
            }}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_currency, Currency::Eur);
        assert_eq!(config.approval.tiers.len(), 2);
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
