//! Storefront wallet widget.
//!
//! The widget is modelled as a pure reducer, `reduce(state, event) -> (state', effects)`,
//! plus a [`WidgetController`] that executes the effects against an injected
//! [`WalletApi`] and [`WidgetView`]. Nothing here touches a DOM; a browser
//! binding only has to implement `WidgetView` and forward user events.
//!
//! ```text
//! closed ──Open──▶ open(loading) ──balance+history──▶ open(ready)
//!   ▲                                                 │      ▲
//!   └──────────────────Close──────────────────────────┘      │
//!                  (ignored while redeeming)                 │
//!                               SubmitRedeem ▼               │ RedeemFinished
//!                                      open(redeeming) ──────┘
//! ```

mod client;
mod controller;
mod view;

pub use client::{HttpWalletApi, LocalWalletApi, WalletApi, WidgetError};
pub use controller::WidgetController;
pub use view::{format_money, screen, HistoryPanel, HistoryRow, Screen, StatsPanel, WidgetView};

use rust_decimal::Decimal;
use std::time::Duration;

use crate::history::sort_recent_first;
use crate::models::{Balance, HistoryFilter, RedeemRequest, Transaction};
use crate::redeem::parse_redeem_amount;

/// Transient messages clear after this long unless replaced first.
pub const MESSAGE_TTL: Duration = Duration::from_secs(5);

pub const DEMO_WARNING: &str = "Visualização de demonstração - faça login para dados reais";
pub const LOGIN_REQUIRED: &str = "É necessário estar logado para resgatar Bazicash";
pub const INVALID_REDEEM_AMOUNT: &str = "Digite um valor válido para resgate";
pub const INSUFFICIENT_BALANCE: &str = "Saldo insuficiente para este resgate";
pub const REDEEM_SUCCESS: &str = "Resgate realizado com sucesso!";
pub const CONNECTION_ERROR: &str = "Erro de conexão. Tente novamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Redeeming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Open(Phase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetState {
    /// Logged-in customer; `None` runs the widget in demo mode.
    pub email: Option<String>,
    pub modal: Modal,
    pub tab: HistoryFilter,
    /// Last known balance. Advisory only, the platform owns the real one.
    pub balance: Option<Balance>,
    /// Full history, most recent first. Tabs filter this.
    pub history: Option<Vec<Transaction>>,
    pub message: Option<Message>,
    awaiting_balance: bool,
    awaiting_history: Option<u64>,
    seq: u64,
}

impl WidgetState {
    pub fn new(email: Option<String>) -> Self {
        Self {
            email: email.filter(|e| !e.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn is_demo(&self) -> bool {
        self.email.is_none()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn show(&mut self, text: impl Into<String>, kind: MessageKind, effects: &mut Vec<Effect>) {
        let id = self.next_seq();
        self.message = Some(Message {
            id,
            text: text.into(),
            kind,
        });
        effects.push(Effect::ExpireMessage { id, after: MESSAGE_TTL });
    }

    fn settle_loading(&mut self) {
        if self.modal == Modal::Open(Phase::Loading) && !self.awaiting_balance && self.awaiting_history.is_none() {
            self.modal = Modal::Open(Phase::Ready);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Open,
    Close,
    BalanceLoaded(Result<Balance, String>),
    HistoryLoaded {
        request: u64,
        result: Result<Vec<Transaction>, String>,
    },
    SwitchTab(HistoryFilter),
    /// Raw text of the amount input.
    SubmitRedeem { amount: String },
    RedeemFinished {
        amount: Decimal,
        result: Result<String, String>,
    },
    MessageExpired(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchBalance,
    FetchHistory { request: u64 },
    Redeem(RedeemRequest),
    ExpireMessage { id: u64, after: Duration },
    Render,
}

/// One state transition. Events that make no sense in the current state are ignored.
pub fn reduce(mut state: WidgetState, event: WidgetEvent) -> (WidgetState, Vec<Effect>) {
    let mut effects = Vec::new();

    match event {
        WidgetEvent::Open => {
            if state.modal != Modal::Closed {
                return (state, effects);
            }
            state.modal = Modal::Open(Phase::Loading);
            state.awaiting_balance = true;
            let request = state.next_seq();
            state.awaiting_history = Some(request);
            if state.is_demo() {
                state.show(DEMO_WARNING, MessageKind::Warning, &mut effects);
            }
            effects.push(Effect::FetchBalance);
            effects.push(Effect::FetchHistory { request });
        }

        WidgetEvent::Close => {
            // the redeem outcome has to be shown, so stay open until it lands
            if matches!(state.modal, Modal::Closed | Modal::Open(Phase::Redeeming)) {
                return (state, effects);
            }
            state.modal = Modal::Closed;
            state.message = None;
            state.awaiting_balance = false;
            state.awaiting_history = None;
        }

        WidgetEvent::BalanceLoaded(result) => {
            if !state.awaiting_balance {
                return (state, effects);
            }
            state.awaiting_balance = false;
            match result {
                Ok(balance) => state.balance = Some(balance),
                Err(msg) => state.show(msg, MessageKind::Error, &mut effects),
            }
            state.settle_loading();
        }

        WidgetEvent::HistoryLoaded { request, result } => {
            // a newer load superseded this one
            if state.awaiting_history != Some(request) {
                return (state, effects);
            }
            state.awaiting_history = None;
            match result {
                Ok(mut history) => {
                    sort_recent_first(&mut history);
                    state.history = Some(history);
                }
                Err(msg) => state.show(msg, MessageKind::Error, &mut effects),
            }
            state.settle_loading();
        }

        WidgetEvent::SwitchTab(tab) => {
            if state.modal == Modal::Closed || state.tab == tab {
                return (state, effects);
            }
            state.tab = tab;
        }

        WidgetEvent::SubmitRedeem { amount } => {
            if state.modal != Modal::Open(Phase::Ready) {
                return (state, effects);
            }
            let Some(email) = state.email.clone() else {
                state.show(LOGIN_REQUIRED, MessageKind::Error, &mut effects);
                effects.push(Effect::Render);
                return (state, effects);
            };
            let raw = serde_json::Value::String(amount);
            let Some(amount) = parse_redeem_amount(Some(&raw)) else {
                state.show(INVALID_REDEEM_AMOUNT, MessageKind::Error, &mut effects);
                effects.push(Effect::Render);
                return (state, effects);
            };
            if let Some(balance) = &state.balance {
                if amount > balance.amount {
                    state.show(INSUFFICIENT_BALANCE, MessageKind::Error, &mut effects);
                    effects.push(Effect::Render);
                    return (state, effects);
                }
            }
            state.modal = Modal::Open(Phase::Redeeming);
            state.message = None;
            effects.push(Effect::Redeem(RedeemRequest {
                customer_email: email,
                amount,
            }));
        }

        WidgetEvent::RedeemFinished { amount, result } => {
            if state.modal != Modal::Open(Phase::Redeeming) {
                return (state, effects);
            }
            state.modal = Modal::Open(Phase::Ready);
            match result {
                Ok(msg) => {
                    if let Some(balance) = state.balance.as_mut() {
                        balance.amount = (balance.amount - amount).max(Decimal::ZERO);
                    }
                    let text = if msg.is_empty() { REDEEM_SUCCESS.to_string() } else { msg };
                    state.show(text, MessageKind::Success, &mut effects);
                }
                Err(msg) => state.show(msg, MessageKind::Error, &mut effects),
            }
        }

        WidgetEvent::MessageExpired(id) => {
            if state.message.as_ref().map(|m| m.id) != Some(id) {
                return (state, effects);
            }
            state.message = None;
        }
    }

    effects.push(Effect::Render);
    (state, effects)
}
