use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Transaction, TransactionKind};

/// Totals derived from a history. Recomputed on every load, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_credits: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_debits: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_percent: Decimal,
}

impl StatisticsSummary {
    pub fn from_history(history: &[Transaction]) -> Self {
        let (total_credits, total_debits) =
            history
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(credits, debits), tx| match tx.kind {
                    TransactionKind::Credit => (saturating_add(credits, tx.amount.abs()), debits),
                    TransactionKind::Debit => (credits, saturating_add(debits, tx.amount.abs())),
                });

        // (credits - debits) / credits * 100, zero when nothing was earned
        let savings_percent = if total_credits > Decimal::ZERO {
            let net = total_credits.checked_sub(total_debits).unwrap_or(Decimal::MIN);
            net.checked_div(total_credits)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or_else(|| {
                    warn!("Savings percentage out of range (credits {}, debits {})", total_credits, total_debits);
                    if net.is_sign_negative() {
                        Decimal::MIN
                    } else {
                        Decimal::MAX
                    }
                })
        } else {
            Decimal::ZERO
        };

        Self {
            total_credits,
            total_debits,
            savings_percent,
        }
    }

    /// Whole-number percentage for display, e.g. `57%`.
    pub fn savings_label(&self) -> String {
        match self.savings_percent.round().to_i64() {
            Some(pct) => format!("{}%", pct),
            None if self.savings_percent.is_sign_negative() => "-∞%".to_string(),
            None => "0%".to_string(),
        }
    }
}

fn saturating_add(total: Decimal, amount: Decimal) -> Decimal {
    total.checked_add(amount).unwrap_or(Decimal::MAX)
}
