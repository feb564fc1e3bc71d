// src/shopify.rs
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Account, CreditAccountRecord, TransactionRecord};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("could not decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream response carried no data")]
    MissingData,
}

pub const CUSTOMER_BY_EMAIL: &str = r#"
query getCustomer($email: String!) {
  customers(first: 5, query: $email) {
    edges { node { id email displayName } }
  }
}"#;

pub const STORE_CREDIT_BALANCE: &str = r#"
query getStoreCredit($customerId: ID!) {
  customer(id: $customerId) {
    id
    storeCreditAccounts(first: 10) {
      edges { node { id balance { amount currencyCode } } }
    }
  }
}"#;

pub const STORE_CREDIT_HISTORY: &str = r#"
query getStoreCreditHistory($customerId: ID!, $first: Int!) {
  customer(id: $customerId) {
    id
    storeCreditAccounts(first: 1) {
      edges {
        node {
          id
          transactions(first: $first) {
            edges { node { id amount { amount currencyCode } createdAt } }
          }
        }
      }
    }
  }
}"#;

pub const APP_PROXY_QUERY: &str = r#"
query { app { proxy { url subPath subPathPrefix } } }"#;

pub const APP_PROXY_SET: &str = r#"
mutation appProxySet($input: AppProxySetInput!) {
  appProxySet(input: $input) {
    appProxy { url subPath subPathPrefix }
    userErrors { field message }
  }
}"#;

// ---------- wire shapes ----------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct CustomersData {
    customers: Connection<CustomerNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode {
    id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerCreditData {
    customer: Option<CustomerCredit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerCredit {
    store_credit_accounts: Option<Connection<CreditAccountNode>>,
}

#[derive(Debug, Deserialize)]
struct CreditAccountNode {
    id: String,
    balance: Option<Money>,
    transactions: Option<Connection<TransactionNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Money {
    amount: Option<Value>, // usually a decimal string, tolerate numbers
    currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionNode {
    id: String,
    amount: Money,
    created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppProxy {
    pub url: String,
    pub sub_path: String,
    pub sub_path_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppProxyInput {
    pub url: String,
    pub sub_path: String,
    pub sub_path_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct AppData {
    app: Option<AppNode>,
}

#[derive(Debug, Deserialize)]
struct AppNode {
    proxy: Option<AppProxy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppProxySetData {
    app_proxy_set: AppProxySetPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppProxySetPayload {
    pub app_proxy: Option<AppProxy>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// ---------- decoding ----------

/// Decode a GraphQL envelope. Any entry in `errors` fails the whole call.
fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T, UpstreamError> {
    let parsed: GraphQlResponse<T> = serde_json::from_str(text)?;
    if !parsed.errors.is_empty() {
        let joined = parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(UpstreamError::GraphQl(joined));
    }
    parsed.data.ok_or(UpstreamError::MissingData)
}

fn money_amount(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Search is fuzzy upstream, so only a node whose email matches exactly counts.
fn customer_from(data: CustomersData, email: &str) -> Option<Account> {
    data.customers
        .edges
        .into_iter()
        .map(|edge| edge.node)
        .find(|node| {
            node.email
                .as_deref()
                .is_some_and(|e| e.trim().eq_ignore_ascii_case(email.trim()))
        })
        .map(|node| Account {
            id: node.id,
            email: node.email.unwrap_or_default(),
            display_name: node.display_name.unwrap_or_default(),
        })
}

/// `email:"..."` search term, with quotes and backslashes escaped.
fn email_search_term(email: &str) -> String {
    let escaped = email.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("email:\"{}\"", escaped)
}

fn credit_accounts_from(data: CustomerCreditData) -> Vec<CreditAccountRecord> {
    data.customer
        .and_then(|c| c.store_credit_accounts)
        .map(|conn| {
            conn.edges
                .into_iter()
                .map(|edge| {
                    let (amount, currency_code) = match edge.node.balance {
                        Some(money) => (money_amount(money.amount), money.currency_code),
                        None => (None, None),
                    };
                    CreditAccountRecord {
                        id: edge.node.id,
                        amount,
                        currency_code,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn transactions_from(data: CustomerCreditData) -> Vec<TransactionRecord> {
    data.customer
        .and_then(|c| c.store_credit_accounts)
        .and_then(|conn| conn.edges.into_iter().next())
        .and_then(|edge| edge.node.transactions)
        .map(|conn| {
            conn.edges
                .into_iter()
                .map(|edge| TransactionRecord {
                    id: edge.node.id,
                    amount: money_amount(edge.node.amount.amount).unwrap_or_default(),
                    created_at: edge.node.created_at,
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------- client ----------

/// Admin GraphQL client for one store. Cheap to clone.
#[derive(Clone)]
pub struct ShopifyClient {
    endpoint: String,
    access_token: String,
    http: Client,
}

impl ShopifyClient {
    pub fn new(cfg: &Config) -> Result<Self, UpstreamError> {
        Self::with_endpoint(cfg.graphql_endpoint(), cfg.access_token.clone())
    }

    pub fn with_endpoint(endpoint: String, access_token: String) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .user_agent(concat!("bazicash-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            endpoint,
            access_token,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one GraphQL operation. No retries: failures surface immediately.
    pub async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, UpstreamError> {
        debug!("📡 GraphQL → {}", self.endpoint);

        let resp = self
            .http
            .post(&self.endpoint)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let text = resp.text().await?;
        debug!("📩 GraphQL response: {} bytes", text.len());
        decode_response(&text)
    }

    /// First customer whose email matches. The platform enforces one account per email.
    pub async fn customer_by_email(&self, email: &str) -> Result<Option<Account>, UpstreamError> {
        let data: CustomersData = self
            .request(CUSTOMER_BY_EMAIL, json!({ "email": email_search_term(email) }))
            .await?;
        Ok(customer_from(data, email))
    }

    pub async fn store_credit_accounts(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CreditAccountRecord>, UpstreamError> {
        let data: CustomerCreditData = self
            .request(STORE_CREDIT_BALANCE, json!({ "customerId": customer_id }))
            .await?;
        Ok(credit_accounts_from(data))
    }

    /// Transactions of the customer's first store-credit account, upstream order.
    pub async fn store_credit_transactions(
        &self,
        customer_id: &str,
        first: u32,
    ) -> Result<Vec<TransactionRecord>, UpstreamError> {
        let data: CustomerCreditData = self
            .request(
                STORE_CREDIT_HISTORY,
                json!({ "customerId": customer_id, "first": first }),
            )
            .await?;
        Ok(transactions_from(data))
    }

    pub async fn current_app_proxy(&self) -> Result<Option<AppProxy>, UpstreamError> {
        let data: AppData = self.request(APP_PROXY_QUERY, json!({})).await?;
        Ok(data.app.and_then(|a| a.proxy))
    }

    pub async fn set_app_proxy(
        &self,
        input: &AppProxyInput,
    ) -> Result<AppProxySetPayload, UpstreamError> {
        info!("🔧 appProxySet url={} subpath=/{}/{}", input.url, input.sub_path_prefix, input.sub_path);
        let data: AppProxySetData = self
            .request(APP_PROXY_SET, json!({ "input": input }))
            .await?;
        Ok(data.app_proxy_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_first_customer() {
        let text = r#"{"data":{"customers":{"edges":[
            {"node":{"id":"gid://shopify/Customer/1","email":"ana@example.com","displayName":"Ana"}},
            {"node":{"id":"gid://shopify/Customer/2","email":"ana@example.com","displayName":"Ana 2"}}
        ]}}}"#;
        let account = customer_from(decode_response(text).unwrap(), "ana@example.com").unwrap();
        assert_eq!(account.id, "gid://shopify/Customer/1");
        assert_eq!(account.display_name, "Ana");
    }

    #[test]
    fn near_match_customers_are_skipped() {
        let text = r#"{"data":{"customers":{"edges":[
            {"node":{"id":"gid://shopify/Customer/7","email":"joana@example.com","displayName":"Joana"}},
            {"node":{"id":"gid://shopify/Customer/8","email":"Ana@Example.com","displayName":"Ana"}}
        ]}}}"#;
        let account = customer_from(decode_response(text).unwrap(), "ana@example.com").unwrap();
        assert_eq!(account.id, "gid://shopify/Customer/8");

        let only_near = r#"{"data":{"customers":{"edges":[
            {"node":{"id":"gid://shopify/Customer/7","email":"joana@example.com","displayName":"Joana"}},
            {"node":{"id":"gid://shopify/Customer/9","displayName":"No email"}}
        ]}}}"#;
        assert!(customer_from(decode_response(only_near).unwrap(), "ana@example.com").is_none());
    }

    #[test]
    fn search_term_is_quoted() {
        assert_eq!(email_search_term(" ana@example.com "), r#"email:"ana@example.com""#);
        assert_eq!(email_search_term(r#"a"b@x.com"#), r#"email:"a\"b@x.com""#);
    }

    #[test]
    fn no_customer_edges_is_none() {
        let text = r#"{"data":{"customers":{"edges":[]}}}"#;
        assert!(customer_from(decode_response(text).unwrap(), "ana@example.com").is_none());
    }

    #[test]
    fn graphql_errors_fail_the_call() {
        let text = r#"{"data":null,"errors":[{"message":"Throttled"},{"message":"Access denied"}]}"#;
        match decode_response::<CustomersData>(text) {
            Err(UpstreamError::GraphQl(msg)) => assert_eq!(msg, "Throttled; Access denied"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_data_is_an_error() {
        assert!(matches!(
            decode_response::<CustomersData>(r#"{"data":null}"#),
            Err(UpstreamError::MissingData)
        ));
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(
            decode_response::<CustomersData>("<html>502</html>"),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn decodes_credit_accounts_tolerating_gaps() {
        let text = r#"{"data":{"customer":{"id":"c","storeCreditAccounts":{"edges":[
            {"node":{"id":"acc-1","balance":{"amount":"125.50","currencyCode":"BRL"}}},
            {"node":{"id":"acc-2","balance":{"amount":7,"currencyCode":null}}},
            {"node":{"id":"acc-3","balance":null}}
        ]}}}}"#;
        let accounts = credit_accounts_from(decode_response(text).unwrap());
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].amount.as_deref(), Some("125.50"));
        assert_eq!(accounts[1].amount.as_deref(), Some("7"));
        assert_eq!(accounts[1].currency_code, None);
        assert_eq!(accounts[2].amount, None);
    }

    #[test]
    fn unknown_customer_has_no_accounts() {
        let text = r#"{"data":{"customer":null}}"#;
        assert!(credit_accounts_from(decode_response(text).unwrap()).is_empty());
    }

    #[test]
    fn decodes_transactions_of_first_account() {
        let text = r#"{"data":{"customer":{"id":"c","storeCreditAccounts":{"edges":[
            {"node":{"id":"acc-1","transactions":{"edges":[
                {"node":{"id":"gid://shopify/StoreCreditAccountCreditTransaction/11","amount":{"amount":"150.0","currencyCode":"BRL"},"createdAt":"2024-01-15T10:30:00Z"}},
                {"node":{"id":"gid://shopify/StoreCreditAccountDebitTransaction/12","amount":{"amount":"-20.0","currencyCode":"BRL"},"createdAt":"2024-01-20T16:45:00Z"}}
            ]}}}
        ]}}}}"#;
        let txs = transactions_from(decode_response(text).unwrap());
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].amount, "-20.0");
        assert_eq!(txs[0].created_at, "2024-01-15T10:30:00Z");
    }

    #[test]
    fn decodes_app_proxy_set_user_errors() {
        let text = r#"{"data":{"appProxySet":{"appProxy":null,"userErrors":[{"field":["input","url"],"message":"Url is invalid"}]}}}"#;
        let data: AppProxySetData = decode_response(text).unwrap();
        assert_eq!(data.app_proxy_set.user_errors[0].message, "Url is invalid");
        assert!(data.app_proxy_set.app_proxy.is_none());
    }

    #[test]
    fn app_proxy_input_uses_platform_field_names() {
        let input = AppProxyInput {
            url: "https://backend.test/proxy".into(),
            sub_path: "bazicash".into(),
            sub_path_prefix: "apps".into(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["subPathPrefix"], "apps");
        assert_eq!(json["subPath"], "bazicash");
    }
}
