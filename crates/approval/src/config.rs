//! Approval tier configuration
//!
//! Tiers are configuration, not constants. Defaults mirror a typical retail
//! bank: small amounts go through automatically, mid-size amounts need a
//! manager, large amounts need a director.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a tier does with the transactions it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierDecision {
    /// Complete without human review
    AutoApprove,

    /// Hold for manual approval by the named role
    RequireRole(String),
}

/// One contiguous amount range `[min, max)` and its decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Handler name recorded on every transaction this tier classifies
    pub name: String,

    /// Inclusive lower bound
    pub min: Decimal,

    /// Exclusive upper bound; `None` means unbounded
    #[serde(default)]
    pub max: Option<Decimal>,

    pub decision: TierDecision,
}

impl TierConfig {
    pub fn auto(name: impl Into<String>, min: Decimal, max: Option<Decimal>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            decision: TierDecision::AutoApprove,
        }
    }

    pub fn role(
        name: impl Into<String>,
        min: Decimal,
        max: Option<Decimal>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            decision: TierDecision::RequireRole(role.into()),
        }
    }
}

/// Configuration for the approval chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Tiers in chain order (ascending amounts)
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
}

/// Amounts below this complete without review
pub fn default_auto_approval_threshold() -> Decimal {
    Decimal::new(1_000, 0)
}

/// Amounts at or above this need a director
pub fn default_director_threshold() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_tiers() -> Vec<TierConfig> {
    let auto = default_auto_approval_threshold();
    let director = default_director_threshold();
    vec![
        TierConfig::auto("auto", Decimal::ZERO, Some(auto)),
        TierConfig::role("manager", auto, Some(director), "manager"),
        TierConfig::role("director", director, None, "director"),
    ]
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

impl ApprovalConfig {
    /// Three-tier setup with custom thresholds
    pub fn with_thresholds(auto_below: Decimal, director_from: Decimal) -> Self {
        Self {
            tiers: vec![
                TierConfig::auto("auto", Decimal::ZERO, Some(auto_below)),
                TierConfig::role("manager", auto_below, Some(director_from), "manager"),
                TierConfig::role("director", director_from, None, "director"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_tiers() {
        let config = ApprovalConfig::default();
        assert_eq!(config.tiers.len(), 3);
        assert_eq!(config.tiers[0].max, Some(dec!(1000)));
        assert_eq!(config.tiers[1].min, dec!(1000));
        assert_eq!(
            config.tiers[2].decision,
            TierDecision::RequireRole("director".to_string())
        );
        assert!(config.tiers[2].max.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "tiers": [
                { "name": "auto", "min": "0", "max": "500", "decision": "auto_approve" },
                { "name": "supervisor", "min": "500", "decision": { "require_role": "supervisor" } }
            ]
        }"#;
        let config: ApprovalConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers[0].decision, TierDecision::AutoApprove);
        assert_eq!(config.tiers[1].max, None);
    }

    #[test]
    fn test_missing_tiers_use_defaults() {
        let config: ApprovalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ApprovalConfig::default());
    }

    #[test]
    fn test_with_thresholds() {
        let config = ApprovalConfig::with_thresholds(dec!(200), dec!(5000));
        assert_eq!(config.tiers[0].max, Some(dec!(200)));
        assert_eq!(config.tiers[2].min, dec!(5000));
    }
}
