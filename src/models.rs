// src/models.rs
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A customer account as the commerce platform knows it. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// A store-credit account exactly as returned upstream, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditAccountRecord {
    pub id: String,
    pub amount: Option<String>,        // decimal string, may be missing or garbage
    pub currency_code: Option<String>,
}

/// A store-credit transaction exactly as returned upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,          // platform gid, e.g. gid://shopify/StoreCreditAccountCreditTransaction/123
    pub amount: String,      // signed decimal string
    pub created_at: String,  // RFC3339
}

/// Redeemable credit for one account, fetched fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(rename = "balance", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    /// Positive upstream amounts are credits; zero and negative are debits.
    pub fn from_signed(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            Self::Credit
        } else {
            Self::Debit
        }
    }
}

/// A normalized history entry. `amount` is always the absolute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub date: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// History tab selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    #[serde(alias = "credits-only", alias = "ganhos")]
    Credits,
    #[serde(alias = "debits-only", alias = "resgates")]
    Debits,
}

impl HistoryFilter {
    pub fn matches(self, kind: TransactionKind) -> bool {
        match self {
            Self::All => true,
            Self::Credits => kind == TransactionKind::Credit,
            Self::Debits => kind == TransactionKind::Debit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Credits => "credits",
            Self::Debits => "debits",
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "credits" | "credits-only" | "ganhos" => Ok(Self::Credits),
            "debits" | "debits-only" | "resgates" => Ok(Self::Debits),
            other => Err(format!("filtro desconhecido: {}", other)),
        }
    }
}

/// A validated redemption attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemRequest {
    pub customer_email: String,
    pub amount: Decimal,
}
