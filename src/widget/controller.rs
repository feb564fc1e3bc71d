use std::collections::VecDeque;
use std::time::Instant;
use tracing::debug;

use super::client::{LocalWalletApi, WalletApi, WidgetError};
use super::view::{screen, WidgetView};
use super::{reduce, Effect, WidgetEvent, WidgetState};
use crate::source::{FixtureSource, DEMO_EMAIL};

/// One widget instance: owns its state and runs effects through the injected
/// API and view. Effects run one at a time, so at most one call is in flight.
pub struct WidgetController<A, V> {
    state: WidgetState,
    api: A,
    demo: LocalWalletApi<FixtureSource>,
    view: V,
    expiry: Option<(u64, Instant)>,
}

impl<A: WalletApi, V: WidgetView> WidgetController<A, V> {
    pub fn new(email: Option<String>, api: A, view: V) -> Self {
        Self {
            state: WidgetState::new(email),
            api,
            demo: LocalWalletApi::new(FixtureSource::demo(), "BRL"),
            view,
            expiry: None,
        }
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Signed-in customers go to the real API, anonymous visitors see the demo wallet.
    fn api(&self) -> (&dyn WalletApi, String) {
        match &self.state.email {
            Some(email) => (&self.api as &dyn WalletApi, email.clone()),
            None => (&self.demo as &dyn WalletApi, DEMO_EMAIL.to_string()),
        }
    }

    /// Feed one user event, then every follow-up event its effects produce.
    pub async fn dispatch(&mut self, event: WidgetEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            debug!("widget event: {:?}", event);
            let (state, effects) = reduce(std::mem::take(&mut self.state), event);
            self.state = state;

            for effect in effects {
                match effect {
                    Effect::Render => self.view.render(&screen(&self.state)),
                    Effect::ExpireMessage { id, after } => {
                        self.expiry = Some((id, Instant::now() + after));
                    }
                    Effect::FetchBalance => {
                        let (api, email) = self.api();
                        let result = api.balance(&email).await.map_err(|e| e.user_message());
                        queue.push_back(WidgetEvent::BalanceLoaded(result));
                    }
                    Effect::FetchHistory { request } => {
                        let (api, email) = self.api();
                        let result = api.history(&email).await.map_err(|e| e.user_message());
                        queue.push_back(WidgetEvent::HistoryLoaded { request, result });
                    }
                    Effect::Redeem(request) => {
                        let result = self
                            .api
                            .redeem(&request.customer_email, request.amount)
                            .await
                            .map_err(|e: WidgetError| e.user_message());
                        queue.push_back(WidgetEvent::RedeemFinished {
                            amount: request.amount,
                            result,
                        });
                    }
                }
            }
        }
    }

    /// Clear the pending message if its time is up.
    pub async fn tick(&mut self, now: Instant) {
        if let Some((id, deadline)) = self.expiry {
            if now >= deadline {
                self.expiry = None;
                self.dispatch(WidgetEvent::MessageExpired(id)).await;
            }
        }
    }
}
