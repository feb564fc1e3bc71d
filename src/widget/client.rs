use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use super::CONNECTION_ERROR;
use crate::balance::fetch_balance;
use crate::error::ProxyError;
use crate::history::fetch_history;
use crate::identity::resolve_customer;
use crate::models::{Balance, RedeemRequest, Transaction};
use crate::redeem;
use crate::source::StoreCreditSource;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with `success: false`.
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl WidgetError {
    /// Banner text for the customer.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.is_empty() => message.clone(),
            _ => CONNECTION_ERROR.to_string(),
        }
    }
}

impl From<ProxyError> for WidgetError {
    fn from(e: ProxyError) -> Self {
        Self::Rejected {
            status: e.status().as_u16(),
            message: e.to_string(),
        }
    }
}

/// What the widget needs from the backend.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn balance(&self, email: &str) -> Result<Balance, WidgetError>;

    async fn history(&self, email: &str) -> Result<Vec<Transaction>, WidgetError>;

    /// Returns the backend's confirmation message.
    async fn redeem(&self, email: &str, amount: Decimal) -> Result<String, WidgetError>;
}

// ---------- HTTP, through the storefront proxy ----------

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceBody {
    #[serde(flatten)]
    balance: Balance,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    history: Vec<Transaction>,
}

/// Talks to `<storefront>/apps/<subpath>`, which the platform signs and forwards.
#[derive(Clone)]
pub struct HttpWalletApi {
    base_url: String,
    http: Client,
}

impl HttpWalletApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WidgetError> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Decode a `{success, ...}` body; non-success bodies become `Rejected`.
    async fn read<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, WidgetError> {
        let status = resp.status();
        let text = resp.text().await?;

        let envelope: Envelope = serde_json::from_str(&text).unwrap_or(Envelope {
            success: false,
            message: None,
        });
        if !status.is_success() || !envelope.success {
            warn!("Wallet request failed with HTTP {}", status);
            return Err(WidgetError::Rejected {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl WalletApi for HttpWalletApi {
    async fn balance(&self, email: &str) -> Result<Balance, WidgetError> {
        let resp = self
            .http
            .get(format!("{}/balance", self.base_url))
            .query(&[("customer_email", email)])
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;
        let body: BalanceBody = Self::read(resp).await?;
        Ok(body.balance)
    }

    async fn history(&self, email: &str) -> Result<Vec<Transaction>, WidgetError> {
        let resp = self
            .http
            .get(format!("{}/history", self.base_url))
            .query(&[("customer_email", email)])
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;
        let body: HistoryBody = Self::read(resp).await?;
        Ok(body.history)
    }

    async fn redeem(&self, email: &str, amount: Decimal) -> Result<String, WidgetError> {
        let resp = self
            .http
            .post(format!("{}/redeem", self.base_url))
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&json!({ "customer_email": email, "amount": amount.to_f64() }))
            .send()
            .await?;
        let body: Envelope = Self::read(resp).await?;
        Ok(body.message.unwrap_or_default())
    }
}

// ---------- in-process, straight against a data source ----------

/// Runs the proxy's fetch logic in-process. With a fixture source this is
/// the widget's demo data; in tests it replaces the network.
pub struct LocalWalletApi<S> {
    source: S,
    default_currency: String,
}

impl<S: StoreCreditSource> LocalWalletApi<S> {
    pub fn new(source: S, default_currency: impl Into<String>) -> Self {
        Self {
            source,
            default_currency: default_currency.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: StoreCreditSource> WalletApi for LocalWalletApi<S> {
    async fn balance(&self, email: &str) -> Result<Balance, WidgetError> {
        let customer = resolve_customer(&self.source, email, "Erro ao buscar saldo").await?;
        Ok(fetch_balance(&self.source, &customer.id, &self.default_currency).await?)
    }

    async fn history(&self, email: &str) -> Result<Vec<Transaction>, WidgetError> {
        let customer = resolve_customer(&self.source, email, "Erro ao buscar histórico").await?;
        Ok(fetch_history(&self.source, &customer.id).await?)
    }

    async fn redeem(&self, email: &str, amount: Decimal) -> Result<String, WidgetError> {
        let request = RedeemRequest {
            customer_email: email.to_string(),
            amount,
        };
        redeem::apply(&request)?;
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureSource, DEMO_CUSTOMER_ID, DEMO_EMAIL};

    #[tokio::test]
    async fn local_api_serves_fixture_wallet() {
        let api = LocalWalletApi::new(FixtureSource::demo(), "BRL");
        let balance = api.balance(DEMO_EMAIL).await.unwrap();
        assert_eq!(balance.amount, Decimal::new(12550, 2));
        assert_eq!(api.history(DEMO_EMAIL).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn local_api_maps_not_found() {
        let api = LocalWalletApi::new(FixtureSource::demo(), "BRL");
        match api.balance("a@x.com").await {
            Err(WidgetError::Rejected { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn local_redeem_is_not_supported() {
        let api = LocalWalletApi::new(FixtureSource::demo(), "BRL");
        let err = api.redeem(DEMO_EMAIL, Decimal::from(5)).await.unwrap_err();
        assert!(matches!(err, WidgetError::Rejected { status: 501, .. }));
        assert!(err.user_message().contains("não suportado"));
    }

    #[tokio::test]
    async fn decodes_successful_proxy_bodies() {
        use crate::api::{BalanceResponse, HistoryResponse};
        use crate::history::fetch_history;
        use crate::models::{Account, HistoryFilter};
        use crate::stats::StatisticsSummary;

        let balance = Balance {
            amount: Decimal::new(12550, 2),
            currency: "BRL".into(),
            account_id: Some("gid://shopify/StoreCreditAccount/5001".into()),
        };
        let sent = BalanceResponse {
            success: true,
            balance: balance.clone(),
            customer: Account {
                id: "gid://shopify/Customer/1001".into(),
                email: DEMO_EMAIL.into(),
                display_name: "Demo".into(),
            },
        };
        let text = serde_json::to_string(&sent).unwrap();
        let decoded: BalanceBody = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.balance, balance);
        assert!(serde_json::from_str::<Envelope>(&text).unwrap().success);

        let source = FixtureSource::demo();
        let history = fetch_history(&source, DEMO_CUSTOMER_ID).await.unwrap();
        let sent = HistoryResponse {
            success: true,
            filter: HistoryFilter::All,
            summary: StatisticsSummary::from_history(&history),
            history: history.clone(),
            empty: None,
        };
        let text = serde_json::to_string(&sent).unwrap();
        let decoded: HistoryBody = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.history, history);
    }

    #[test]
    fn transport_style_errors_show_connection_message() {
        let err = WidgetError::Decode(serde_json::from_str::<Envelope>("nope").unwrap_err());
        assert_eq!(err.user_message(), CONNECTION_ERROR);

        let blank = WidgetError::Rejected { status: 502, message: String::new() };
        assert_eq!(blank.user_message(), CONNECTION_ERROR);
    }
}
