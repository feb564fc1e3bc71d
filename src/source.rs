//! Where customer and store-credit data comes from.
//!
//! The live source is the commerce platform's GraphQL API; the fixture source
//! serves the demo wallet so the widget and the routes can run without a store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{Account, CreditAccountRecord, TransactionRecord};
use crate::shopify::{ShopifyClient, UpstreamError};

#[async_trait]
pub trait StoreCreditSource: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Account>, UpstreamError>;

    async fn credit_accounts(&self, customer_id: &str) -> Result<Vec<CreditAccountRecord>, UpstreamError>;

    /// At most `first` transactions, in whatever order the collaborator returns them.
    async fn transactions(&self, customer_id: &str, first: u32) -> Result<Vec<TransactionRecord>, UpstreamError>;
}

#[async_trait]
impl StoreCreditSource for ShopifyClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Account>, UpstreamError> {
        self.customer_by_email(email).await
    }

    async fn credit_accounts(&self, customer_id: &str) -> Result<Vec<CreditAccountRecord>, UpstreamError> {
        self.store_credit_accounts(customer_id).await
    }

    async fn transactions(&self, customer_id: &str, first: u32) -> Result<Vec<TransactionRecord>, UpstreamError> {
        self.store_credit_transactions(customer_id, first).await
    }
}

pub const DEMO_EMAIL: &str = "demo@bazicash.com.br";
pub const DEMO_CUSTOMER_ID: &str = "gid://shopify/Customer/1001";
pub const DEMO_ACCOUNT_ID: &str = "gid://shopify/StoreCreditAccount/5001";

/// In-memory collaborator with a fixed set of customers.
#[derive(Debug, Default)]
pub struct FixtureSource {
    customers: Vec<(Account, Vec<CreditAccountRecord>, Vec<TransactionRecord>)>,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The demo wallet: 125.50 BRL and eight historical movements.
    pub fn demo() -> Self {
        let account = Account {
            id: DEMO_CUSTOMER_ID.to_string(),
            email: DEMO_EMAIL.to_string(),
            display_name: "Cliente Demonstração".to_string(),
        };
        let credit = CreditAccountRecord {
            id: DEMO_ACCOUNT_ID.to_string(),
            amount: Some("125.50".to_string()),
            currency_code: Some("BRL".to_string()),
        };
        let history = [
            ("Credit", 1, "45.30", "2024-01-15T10:30:00Z"),
            ("Credit", 2, "23.50", "2024-01-18T14:20:00Z"),
            ("Debit", 3, "-15.00", "2024-01-20T16:45:00Z"),
            ("Credit", 4, "67.20", "2024-01-25T11:15:00Z"),
            ("Debit", 5, "-25.00", "2024-01-28T09:30:00Z"),
            ("Credit", 6, "34.80", "2024-02-02T13:20:00Z"),
            ("Debit", 7, "-10.50", "2024-02-05T15:10:00Z"),
            ("Credit", 8, "89.70", "2024-02-10T12:45:00Z"),
        ]
        .into_iter()
        .map(|(kind, n, amount, at)| TransactionRecord {
            id: format!("gid://shopify/StoreCreditAccount{}Transaction/{}", kind, 9000 + n),
            amount: amount.to_string(),
            created_at: at.to_string(),
        })
        .collect();

        Self::new().with_customer(account, vec![credit], history)
    }

    pub fn with_customer(
        mut self,
        account: Account,
        accounts: Vec<CreditAccountRecord>,
        transactions: Vec<TransactionRecord>,
    ) -> Self {
        self.customers.push((account, accounts, transactions));
        self
    }

    /// Number of collaborator calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn by_id(&self, customer_id: &str) -> Option<&(Account, Vec<CreditAccountRecord>, Vec<TransactionRecord>)> {
        self.customers.iter().find(|(a, _, _)| a.id == customer_id)
    }
}

#[async_trait]
impl StoreCreditSource for FixtureSource {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Account>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .customers
            .iter()
            .find(|(a, _, _)| a.email.eq_ignore_ascii_case(email))
            .map(|(a, _, _)| a.clone()))
    }

    async fn credit_accounts(&self, customer_id: &str) -> Result<Vec<CreditAccountRecord>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_id(customer_id).map(|(_, c, _)| c.clone()).unwrap_or_default())
    }

    async fn transactions(&self, customer_id: &str, first: u32) -> Result<Vec<TransactionRecord>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .by_id(customer_id)
            .map(|(_, _, t)| t.iter().take(first as usize).cloned().collect())
            .unwrap_or_default())
    }
}
