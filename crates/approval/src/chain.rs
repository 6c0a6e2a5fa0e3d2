//! Approval Chain - ordered amount-range handlers
//!
//! ```text
//!   amount ──► [0, 1000) auto ──no──► [1000, 10000) manager ──no──► [10000, ∞) director ──no──► REJECTED
//!                  │yes                     │yes                           │yes
//!                  ▼                        ▼                              ▼
//!            AUTO_APPROVED          PENDING (manager)             PENDING (director)
//! ```
//!
//! Each handler owns a half-open range `[low, high)`. The first handler whose
//! range contains the amount decides; if none does, the transaction is
//! rejected with "no suitable handler". Ranges are checked for gaps and
//! overlaps when the chain is built, never at classification time.
//!
//! The chain is immutable once built and holds no interior state, so it can be
//! shared behind an `Arc` and used from any number of tasks at once.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::config::{ApprovalConfig, TierConfig, TierDecision};
use crate::context::{ApprovalContext, ApprovalResult};
use crate::error::ChainError;

/// Half-open amount range `[low, high)`; `high == None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    pub low: Decimal,
    pub high: Option<Decimal>,
}

impl AmountRange {
    pub fn new(low: Decimal, high: Option<Decimal>) -> Self {
        Self { low, high }
    }

    /// Closed at the low end, open at the high end
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.low && self.high.map_or(true, |high| amount < high)
    }
}

/// A (range predicate, decision) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalHandler {
    name: String,
    range: AmountRange,
    decision: TierDecision,
}

impl ApprovalHandler {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> AmountRange {
        self.range
    }

    pub fn decision(&self) -> &TierDecision {
        &self.decision
    }

    fn claims(&self, ctx: &ApprovalContext<'_>) -> bool {
        self.range.contains(ctx.amount().value())
    }

    fn decide(&self) -> ApprovalResult {
        match &self.decision {
            TierDecision::AutoApprove => ApprovalResult::auto_approved(&self.name),
            TierDecision::RequireRole(role) => ApprovalResult::pending(&self.name, role),
        }
    }
}

impl From<&TierConfig> for ApprovalHandler {
    fn from(tier: &TierConfig) -> Self {
        Self {
            name: tier.name.clone(),
            range: AmountRange::new(tier.min, tier.max),
            decision: tier.decision.clone(),
        }
    }
}

/// Ordered chain of approval handlers
#[derive(Debug, Clone)]
pub struct ApprovalChain {
    handlers: Vec<ApprovalHandler>,
}

impl ApprovalChain {
    /// Build and validate a chain from configuration
    pub fn from_config(config: &ApprovalConfig) -> Result<Self, ChainError> {
        Self::new(config.tiers.iter().map(ApprovalHandler::from).collect())
    }

    /// Build a chain from handlers in dispatch order.
    ///
    /// Fails if a range is empty or negative, adjacent ranges leave a gap or
    /// overlap, an unbounded range is not last, or two handlers share a name.
    pub fn new(handlers: Vec<ApprovalHandler>) -> Result<Self, ChainError> {
        let mut names = HashSet::new();

        for handler in &handlers {
            if !names.insert(handler.name.as_str()) {
                return Err(ChainError::DuplicateName(handler.name.clone()));
            }
            if handler.range.low < Decimal::ZERO {
                return Err(ChainError::NegativeLow {
                    name: handler.name.clone(),
                    low: handler.range.low,
                });
            }
            if let Some(high) = handler.range.high {
                if high <= handler.range.low {
                    return Err(ChainError::EmptyRange {
                        name: handler.name.clone(),
                        low: handler.range.low,
                        high,
                    });
                }
            }
        }

        for pair in handlers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let Some(prev_high) = prev.range.high else {
                return Err(ChainError::UnboundedNotLast(prev.name.clone()));
            };
            if prev_high < next.range.low {
                return Err(ChainError::Gap {
                    prev: prev.name.clone(),
                    prev_high,
                    next: next.name.clone(),
                    next_low: next.range.low,
                });
            }
            if prev_high > next.range.low {
                return Err(ChainError::Overlap {
                    prev: prev.name.clone(),
                    prev_high,
                    next: next.name.clone(),
                    next_low: next.range.low,
                });
            }
        }

        if handlers.is_empty() {
            tracing::warn!("Approval chain has no handlers; every transaction will be rejected");
        }

        Ok(Self { handlers })
    }

    pub fn handlers(&self) -> &[ApprovalHandler] {
        &self.handlers
    }

    /// Classify a transaction.
    ///
    /// Never fails: an amount no handler claims yields a REJECTED result.
    pub fn classify(&self, ctx: &ApprovalContext<'_>) -> ApprovalResult {
        for handler in &self.handlers {
            if handler.claims(ctx) {
                let result = handler.decide();
                tracing::debug!(
                    handler = handler.name(),
                    transaction = %ctx.transaction.number,
                    amount = %ctx.amount(),
                    status = %result.status,
                    "Approval handler claimed transaction"
                );
                return result;
            }
        }

        tracing::warn!(
            transaction = %ctx.transaction.number,
            amount = %ctx.amount(),
            "No approval handler claimed transaction"
        );
        ApprovalResult::exhausted(ctx.amount())
    }
}

impl Default for ApprovalChain {
    fn default() -> Self {
        Self {
            handlers: ApprovalConfig::default()
                .tiers
                .iter()
                .map(ApprovalHandler::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corebank_core::{Actor, Amount, Currency, CustomerId};
    use corebank_ledger::{generate_number, Account, ApprovalStatus, Transaction, TransactionType};
    use rust_decimal_macros::dec;

    fn withdrawal(amount: Decimal) -> (Transaction, Account) {
        let account =
            Account::open_with_balance(CustomerId::new(), Currency::Usd, dec!(1_000_000)).unwrap();
        let tx = Transaction::new(
            generate_number(),
            TransactionType::Withdrawal,
            Amount::new(amount).unwrap(),
            Currency::Usd,
            account.id,
            None,
            Actor::system(),
            None,
        )
        .unwrap();
        (tx, account)
    }

    fn classify(chain: &ApprovalChain, amount: Decimal) -> ApprovalResult {
        let (tx, account) = withdrawal(amount);
        chain.classify(&ApprovalContext::new(&tx, &account, None))
    }

    #[test]
    fn test_range_is_closed_low_open_high() {
        let range = AmountRange::new(dec!(1000), Some(dec!(10000)));
        assert!(range.contains(dec!(1000)));
        assert!(range.contains(dec!(9999.99)));
        assert!(!range.contains(dec!(10000)));
        assert!(!range.contains(dec!(999.99)));
        assert!(AmountRange::new(dec!(5), None).contains(dec!(1_000_000_000)));
    }

    #[test]
    fn test_default_chain_routing() {
        let chain = ApprovalChain::from_config(&ApprovalConfig::default()).unwrap();

        let small = classify(&chain, dec!(50));
        assert_eq!(small.status, ApprovalStatus::AutoApproved);
        assert_eq!(small.handler, "auto");

        let mid = classify(&chain, dec!(5000));
        assert_eq!(mid.status, ApprovalStatus::Pending);
        assert_eq!(mid.required_role.as_deref(), Some("manager"));

        let large = classify(&chain, dec!(250000));
        assert_eq!(large.required_role.as_deref(), Some("director"));
    }

    #[test]
    fn test_boundary_goes_to_higher_tier() {
        let chain = ApprovalChain::default();

        let at_auto_limit = classify(&chain, dec!(1000));
        assert_eq!(at_auto_limit.handler, "manager");

        let just_below = classify(&chain, dec!(999.99));
        assert_eq!(just_below.handler, "auto");

        let at_director = classify(&chain, dec!(10000));
        assert_eq!(at_director.handler, "director");
    }

    #[test]
    fn test_exhausted_chain_rejects() {
        let chain = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![
                TierConfig::auto("auto", dec!(0), Some(dec!(100))),
                TierConfig::role("manager", dec!(100), Some(dec!(500)), "manager"),
            ],
        })
        .unwrap();

        let result = classify(&chain, dec!(500));
        assert!(result.is_rejected());
        assert_eq!(result.handler, crate::context::NO_HANDLER);
        assert!(result.comment.unwrap().contains("no suitable handler"));
    }

    #[test]
    fn test_empty_chain_rejects_everything() {
        let chain = ApprovalChain::new(Vec::new()).unwrap();
        assert!(classify(&chain, dec!(1)).is_rejected());
    }

    #[test]
    fn test_gap_is_config_error() {
        let result = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![
                TierConfig::auto("auto", dec!(0), Some(dec!(100))),
                TierConfig::role("manager", dec!(150), None, "manager"),
            ],
        });
        assert!(matches!(result, Err(ChainError::Gap { .. })));
    }

    #[test]
    fn test_overlap_is_config_error() {
        let result = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![
                TierConfig::auto("auto", dec!(0), Some(dec!(1000))),
                TierConfig::role("manager", dec!(900), None, "manager"),
            ],
        });
        assert!(matches!(result, Err(ChainError::Overlap { .. })));
    }

    #[test]
    fn test_unbounded_must_be_last() {
        let result = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![
                TierConfig::auto("auto", dec!(0), None),
                TierConfig::role("manager", dec!(1000), None, "manager"),
            ],
        });
        assert_eq!(result.unwrap_err(), ChainError::UnboundedNotLast("auto".to_string()));
    }

    #[test]
    fn test_invalid_single_ranges() {
        let empty = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![TierConfig::auto("auto", dec!(10), Some(dec!(10)))],
        });
        assert!(matches!(empty, Err(ChainError::EmptyRange { .. })));

        let negative = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![TierConfig::auto("auto", dec!(-1), None)],
        });
        assert!(matches!(negative, Err(ChainError::NegativeLow { .. })));

        let duplicate = ApprovalChain::from_config(&ApprovalConfig {
            tiers: vec![
                TierConfig::auto("auto", dec!(0), Some(dec!(10))),
                TierConfig::auto("auto", dec!(10), None),
            ],
        });
        assert!(matches!(duplicate, Err(ChainError::DuplicateName(_))));
    }

    #[test]
    fn test_chain_is_shareable_across_threads() {
        let chain = std::sync::Arc::new(ApprovalChain::default());
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let chain = std::sync::Arc::clone(&chain);
                std::thread::spawn(move || classify(&chain, Decimal::from(i * 1500)).handler)
            })
            .collect();

        let handlers: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(handlers[0], "manager"); // 1500
        assert_eq!(handlers[6], "director"); // 10500
    }
}
