use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::ProxyError;
use crate::models::{Balance, CreditAccountRecord};
use crate::source::StoreCreditSource;

/// Parse an upstream decimal string. Missing, garbage or negative values read as zero.
pub fn parse_amount(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };
    match Decimal::from_str(raw.trim()) {
        Ok(v) if v >= Decimal::ZERO => v,
        Ok(v) => {
            warn!("Negative balance amount {} reported, using 0", v);
            Decimal::ZERO
        }
        Err(_) => {
            warn!("Unparseable balance amount {:?}, using 0", raw);
            Decimal::ZERO
        }
    }
}

/// Balance from the customer's credit accounts. Only the first account counts;
/// no account at all is a zero balance in the default currency.
pub fn balance_from_accounts(accounts: &[CreditAccountRecord], default_currency: &str) -> Balance {
    match accounts.first() {
        Some(account) => {
            if accounts.len() > 1 {
                info!("Customer has {} credit accounts, reading {}", accounts.len(), account.id);
            }
            Balance {
                amount: parse_amount(account.amount.as_deref()),
                currency: account
                    .currency_code
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| default_currency.to_string()),
                account_id: Some(account.id.clone()),
            }
        }
        None => Balance {
            amount: Decimal::ZERO,
            currency: default_currency.to_string(),
            account_id: None,
        },
    }
}

pub async fn fetch_balance(
    source: &dyn StoreCreditSource,
    customer_id: &str,
    default_currency: &str,
) -> Result<Balance, ProxyError> {
    let accounts = source
        .credit_accounts(customer_id)
        .await
        .map_err(ProxyError::upstream("Erro ao buscar saldo"))?;
    Ok(balance_from_accounts(&accounts, default_currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureSource, DEMO_ACCOUNT_ID, DEMO_CUSTOMER_ID};
    use rstest::rstest;

    fn account(id: &str, amount: Option<&str>, currency: Option<&str>) -> CreditAccountRecord {
        CreditAccountRecord {
            id: id.to_string(),
            amount: amount.map(str::to_string),
            currency_code: currency.map(str::to_string),
        }
    }

    #[rstest]
    #[case(Some("125.50"), "125.50")]
    #[case(Some(" 10 "), "10")]
    #[case(Some("abc"), "0")]
    #[case(Some("-3.00"), "0")]
    #[case(None, "0")]
    fn parses_amount_gracefully(#[case] raw: Option<&str>, #[case] expected: &str) {
        assert_eq!(parse_amount(raw), Decimal::from_str(expected).unwrap());
    }

    #[test]
    fn no_accounts_is_zero_not_error() {
        let balance = balance_from_accounts(&[], "BRL");
        assert_eq!(balance.amount, Decimal::ZERO);
        assert_eq!(balance.currency, "BRL");
        assert_eq!(balance.account_id, None);
    }

    #[test]
    fn first_account_wins() {
        let accounts = [
            account("a1", Some("30.00"), Some("USD")),
            account("a2", Some("99.00"), Some("BRL")),
        ];
        let balance = balance_from_accounts(&accounts, "BRL");
        assert_eq!(balance.amount, Decimal::from(30));
        assert_eq!(balance.currency, "USD");
        assert_eq!(balance.account_id.as_deref(), Some("a1"));
    }

    #[test]
    fn missing_currency_falls_back() {
        let balance = balance_from_accounts(&[account("a1", None, None)], "BRL");
        assert_eq!(balance.currency, "BRL");
        assert_eq!(balance.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn fetching_twice_returns_same_amount() {
        let source = FixtureSource::demo();
        let first = fetch_balance(&source, DEMO_CUSTOMER_ID, "BRL").await.unwrap();
        let second = fetch_balance(&source, DEMO_CUSTOMER_ID, "BRL").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.amount, Decimal::new(12550, 2));
        assert_eq!(first.account_id.as_deref(), Some(DEMO_ACCOUNT_ID));
    }
}
