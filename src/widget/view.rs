use rust_decimal::Decimal;

use super::{Message, Modal, Phase, WidgetState};
use crate::history::{apply_filter, HistoryView};
use crate::models::{HistoryFilter, TransactionKind};
use crate::stats::StatisticsSummary;

/// Rendering port. A browser binding writes `Screen` into the DOM; tests record it.
pub trait WidgetView {
    fn render(&mut self, screen: &Screen);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub description: String,
    pub date: String,
    pub amount_text: String,
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPanel {
    Loading,
    Rows(Vec<HistoryRow>),
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPanel {
    pub total_credits: String,
    pub total_debits: String,
    pub savings: String,
}

/// Everything the widget shows, derived from state alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub visible: bool,
    pub balance_text: String,
    /// Floating button badge, once a balance is known.
    pub badge_text: Option<String>,
    pub stats: Option<StatsPanel>,
    pub tab: HistoryFilter,
    pub history: HistoryPanel,
    pub message: Option<Message>,
    pub redeem_enabled: bool,
    pub redeem_label: &'static str,
}

pub fn format_money(amount: Decimal, currency: &str) -> String {
    let symbol = match currency {
        "BRL" | "" => "R$",
        "USD" => "US$",
        "EUR" => "€",
        other => other,
    };
    format!("{} {:.2}", symbol, amount.round_dp(2))
}

pub fn screen(state: &WidgetState) -> Screen {
    let visible = state.modal != Modal::Closed;
    let currency = state
        .balance
        .as_ref()
        .map(|b| b.currency.as_str())
        .unwrap_or("BRL");

    let balance_text = match (&state.balance, state.modal) {
        (Some(b), _) if state.is_demo() => format!("{} (DEMO)", format_money(b.amount, &b.currency)),
        (Some(b), _) => format_money(b.amount, &b.currency),
        (None, Modal::Open(Phase::Loading)) => "Carregando...".to_string(),
        (None, _) => "Erro ao carregar saldo".to_string(),
    };

    let badge_text = state
        .balance
        .as_ref()
        .map(|b| format_money(b.amount, &b.currency));

    let stats = state.history.as_deref().map(|h| {
        let summary = StatisticsSummary::from_history(h);
        StatsPanel {
            total_credits: format_money(summary.total_credits, currency),
            total_debits: format_money(summary.total_debits, currency),
            savings: summary.savings_label(),
        }
    });

    let history = match state.history.as_deref() {
        None => HistoryPanel::Loading,
        Some(h) => match apply_filter(h, state.tab) {
            HistoryView::Populated(txs) => HistoryPanel::Rows(
                txs.into_iter()
                    .map(|tx| HistoryRow {
                        amount_text: match tx.kind {
                            TransactionKind::Credit => format!("+{}", format_money(tx.amount, currency)),
                            TransactionKind::Debit => format_money(tx.amount, currency),
                        },
                        description: tx.description,
                        date: tx.date,
                        kind: tx.kind,
                    })
                    .collect(),
            ),
            other => HistoryPanel::Empty(other.empty_reason().map(|r| r.message()).unwrap_or_default()),
        },
    };

    let redeeming = state.modal == Modal::Open(Phase::Redeeming);

    Screen {
        visible,
        balance_text,
        badge_text,
        stats,
        tab: state.tab,
        history,
        message: state.message.clone(),
        redeem_enabled: state.modal == Modal::Open(Phase::Ready),
        redeem_label: if redeeming { "Processando..." } else { "Resgatar" },
    }
}
