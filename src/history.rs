use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

use crate::error::ProxyError;
use crate::models::{HistoryFilter, Transaction, TransactionKind, TransactionRecord};
use crate::source::StoreCreditSource;

/// Upper bound on transactions fetched per request.
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// Display date, pt-BR style.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Last path segment of a platform gid: `gid://shopify/X/123` → `123`.
pub fn id_tail(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Normalize one upstream record. Records without a parseable timestamp are
/// dropped since they cannot be ordered.
pub fn normalize(record: &TransactionRecord) -> Option<Transaction> {
    let timestamp = match DateTime::parse_from_rfc3339(record.created_at.trim()) {
        Ok(ts) => ts,
        Err(e) => {
            warn!("Dropping transaction {} with bad createdAt {:?}: {}", record.id, record.created_at, e);
            return None;
        }
    };

    let signed = Decimal::from_str(record.amount.trim()).unwrap_or_else(|_| {
        warn!("Transaction {} has unparseable amount {:?}, using 0", record.id, record.amount);
        Decimal::ZERO
    });
    let kind = TransactionKind::from_signed(signed);
    let tail = id_tail(&record.id);

    let description = match kind {
        TransactionKind::Credit => format!("Crédito adicionado - ID: {}", tail),
        TransactionKind::Debit => format!("Resgate utilizado - ID: {}", tail),
    };

    Some(Transaction {
        id: tail.to_string(),
        kind,
        amount: signed.abs(),
        description,
        date: timestamp.format(DATE_FORMAT).to_string(),
        timestamp,
    })
}

/// Normalize and order most-recent-first. Upstream order is not trusted.
pub fn normalize_all(records: &[TransactionRecord]) -> Vec<Transaction> {
    let mut history: Vec<Transaction> = records.iter().filter_map(normalize).collect();
    sort_recent_first(&mut history);
    history
}

pub fn sort_recent_first(history: &mut [Transaction]) {
    // stable: equal timestamps keep their relative order
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Result of filtering a sorted history.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryView {
    Populated(Vec<Transaction>),
    /// There is history, just nothing under this filter.
    EmptyForFilter,
    Empty,
}

impl HistoryView {
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Self::Populated(txs) => txs,
            _ => &[],
        }
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            Self::Populated(_) => None,
            Self::EmptyForFilter => Some(EmptyReason::NoTransactionsForFilter),
            Self::Empty => Some(EmptyReason::NoTransactions),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoTransactions,
    NoTransactionsForFilter,
}

impl EmptyReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoTransactions => "Nenhuma transação ainda.",
            Self::NoTransactionsForFilter => "Nenhuma transação encontrada para este filtro.",
        }
    }
}

/// Filter an already sorted history, preserving order.
pub fn apply_filter(history: &[Transaction], filter: HistoryFilter) -> HistoryView {
    if history.is_empty() {
        return HistoryView::Empty;
    }
    let selected: Vec<Transaction> = history
        .iter()
        .filter(|tx| filter.matches(tx.kind))
        .cloned()
        .collect();
    if selected.is_empty() {
        HistoryView::EmptyForFilter
    } else {
        HistoryView::Populated(selected)
    }
}

/// Fetch one bounded page and return it normalized, most recent first.
pub async fn fetch_history(
    source: &dyn StoreCreditSource,
    customer_id: &str,
) -> Result<Vec<Transaction>, ProxyError> {
    let records = source
        .transactions(customer_id, HISTORY_PAGE_SIZE)
        .await
        .map_err(ProxyError::upstream("Erro ao buscar histórico"))?;
    Ok(normalize_all(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureSource, DEMO_CUSTOMER_ID};

    fn record(id: &str, amount: &str, at: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            amount: amount.to_string(),
            created_at: at.to_string(),
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            record("gid://shopify/StoreCreditAccountCreditTransaction/1", "150.00", "2024-01-10T10:00:00Z"),
            record("gid://shopify/StoreCreditAccountDebitTransaction/2", "-200.00", "2024-03-01T08:00:00Z"),
            record("gid://shopify/StoreCreditAccountCreditTransaction/3", "320.50", "2024-02-14T18:30:00Z"),
            record("gid://shopify/StoreCreditAccountDebitTransaction/4", "-5", "2023-12-31T23:59:59Z"),
        ]
    }

    #[test]
    fn normalizes_sign_and_description() {
        let credit = normalize(&sample()[0]).unwrap();
        assert_eq!(credit.kind, TransactionKind::Credit);
        assert_eq!(credit.amount, Decimal::from(150));
        assert_eq!(credit.id, "1");
        assert_eq!(credit.description, "Crédito adicionado - ID: 1");
        assert_eq!(credit.date, "10/01/2024");

        let debit = normalize(&sample()[1]).unwrap();
        assert_eq!(debit.kind, TransactionKind::Debit);
        assert_eq!(debit.amount, Decimal::from(200));
        assert_eq!(debit.description, "Resgate utilizado - ID: 2");
    }

    #[test]
    fn kind_agrees_with_raw_sign_and_amount_non_negative() {
        let records = sample();
        for (raw, tx) in records.iter().zip(records.iter().filter_map(normalize)) {
            let signed = Decimal::from_str(&raw.amount).unwrap();
            assert_eq!(tx.kind == TransactionKind::Credit, signed > Decimal::ZERO);
            assert!(tx.amount >= Decimal::ZERO);
        }
    }

    #[test]
    fn bad_amount_reads_as_zero_debit() {
        let tx = normalize(&record("gid://x/9", "n/a", "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(tx.amount, Decimal::ZERO);
        assert_eq!(tx.kind, TransactionKind::Debit);
    }

    #[test]
    fn bad_timestamp_is_dropped() {
        assert!(normalize(&record("gid://x/9", "1", "yesterday")).is_none());
    }

    #[test]
    fn sorted_most_recent_first_regardless_of_input_order() {
        let mut records = sample();
        for _ in 0..records.len() {
            records.rotate_left(1);
            let history = normalize_all(&records);
            assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        }
        let ids: Vec<_> = normalize_all(&sample()).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["2", "3", "1", "4"]);
    }

    #[test]
    fn all_is_disjoint_union_of_credits_and_debits() {
        let history = normalize_all(&sample());
        let all = apply_filter(&history, HistoryFilter::All);
        let credits = apply_filter(&history, HistoryFilter::Credits);
        let debits = apply_filter(&history, HistoryFilter::Debits);

        assert_eq!(all.transactions().len(), credits.transactions().len() + debits.transactions().len());
        assert!(credits.transactions().iter().all(|t| t.kind == TransactionKind::Credit));
        assert!(debits.transactions().iter().all(|t| t.kind == TransactionKind::Debit));

        // relative order survives the split, for both kinds
        for (kind, subset) in [(TransactionKind::Credit, &credits), (TransactionKind::Debit, &debits)] {
            let from_all: Vec<_> = all.transactions().iter().filter(|t| t.kind == kind).collect();
            assert_eq!(from_all, subset.transactions().iter().collect::<Vec<_>>());
        }

        // merging the two subsets back by timestamp reproduces `all` exactly
        let mut merged: Vec<Transaction> = credits
            .transactions()
            .iter()
            .chain(debits.transactions())
            .cloned()
            .collect();
        sort_recent_first(&mut merged);
        assert_eq!(merged, all.transactions());
        assert!(credits
            .transactions()
            .iter()
            .all(|c| !debits.transactions().iter().any(|d| d.id == c.id)));
    }

    #[test]
    fn distinguishes_empty_from_empty_for_filter() {
        assert_eq!(apply_filter(&[], HistoryFilter::Credits), HistoryView::Empty);

        let only_credits = normalize_all(&sample()[..1]);
        let view = apply_filter(&only_credits, HistoryFilter::Debits);
        assert_eq!(view, HistoryView::EmptyForFilter);
        assert_eq!(view.empty_reason(), Some(EmptyReason::NoTransactionsForFilter));
    }

    #[tokio::test]
    async fn fetches_demo_history_sorted() {
        let source = FixtureSource::demo();
        let history = fetch_history(&source, DEMO_CUSTOMER_ID).await.unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history[0].date, "10/02/2024");
        assert_eq!(history[7].date, "15/01/2024");
    }
}
