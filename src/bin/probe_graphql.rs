use anyhow::Context;
use clap::Parser;

use bazicash_proxy::balance::balance_from_accounts;
use bazicash_proxy::history::{normalize_all, HISTORY_PAGE_SIZE};
use bazicash_proxy::shopify::ShopifyClient;
use bazicash_proxy::stats::StatisticsSummary;
use bazicash_proxy::widget::format_money;

/// Check the live store-credit queries for one customer.
#[derive(Debug, Parser)]
#[command(name = "probe-graphql")]
struct Args {
    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = bazicash_proxy::config::load().map_err(|e| anyhow::anyhow!("{e}"))?;
    let client = ShopifyClient::new(&cfg)?;

    println!("Endpoint: {}", client.endpoint());
    println!("Looking up customer {}", args.email);

    let Some(customer) = client
        .customer_by_email(&args.email)
        .await
        .context("customer lookup failed")?
    else {
        println!("Customer not found");
        return Ok(());
    };
    println!("Customer: {} <{}> {}", customer.display_name, customer.email, customer.id);

    let accounts = client
        .store_credit_accounts(&customer.id)
        .await
        .context("store credit lookup failed")?;
    let balance = balance_from_accounts(&accounts, &cfg.default_currency);
    println!(
        "Balance: {} across {} account(s), reading {:?}",
        format_money(balance.amount, &balance.currency),
        accounts.len(),
        balance.account_id
    );

    let records = client
        .store_credit_transactions(&customer.id, HISTORY_PAGE_SIZE)
        .await
        .context("history lookup failed")?;
    let history = normalize_all(&records);
    println!("History: {} transaction(s)", history.len());
    for tx in history.iter().take(10) {
        println!(
            "  {} | {:?} | {} | {}",
            tx.date,
            tx.kind,
            format_money(tx.amount, &balance.currency),
            tx.description
        );
    }

    let summary = StatisticsSummary::from_history(&history);
    println!(
        "Credits {} / Debits {} / Savings {}",
        format_money(summary.total_credits, &balance.currency),
        format_money(summary.total_debits, &balance.currency),
        summary.savings_label()
    );

    Ok(())
}
