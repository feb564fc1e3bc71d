//! One-time registration of the storefront app proxy.
//!
//! Points `/<prefix>/<subpath>` on the store at `BACKEND_URL/proxy`.

use clap::Parser;
use eyre::{bail, Result};
use std::time::Duration;

use bazicash_proxy::config;
use bazicash_proxy::shopify::{AppProxyInput, ShopifyClient};

#[derive(Debug, Parser)]
#[command(name = "setup-proxy", about = "Register the BaziCash app proxy on the store")]
struct Args {
    /// Only print the current configuration.
    #[arg(long)]
    check: bool,

    /// Overwrite an existing proxy without the 5 second grace period.
    #[arg(long)]
    yes: bool,

    /// Storefront path prefix.
    #[arg(long, default_value = "apps")]
    prefix: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let cfg = config::load()?;
    let client = ShopifyClient::new(&cfg)?;

    println!("BaziCash - app proxy setup");
    println!("Store: {}", cfg.store_domain);

    let current = match client.current_app_proxy().await {
        Ok(Some(proxy)) => {
            println!("Current app proxy:");
            println!("   URL: {}", proxy.url);
            println!("   Subpath: /{}/{}", proxy.sub_path_prefix, proxy.sub_path);
            Some(proxy)
        }
        Ok(None) => {
            println!("App proxy not configured yet");
            None
        }
        Err(e) => {
            eprintln!("Could not read current app proxy: {}", e);
            None
        }
    };

    if args.check {
        return Ok(());
    }

    if current.is_some() && !args.yes {
        println!("An app proxy already exists and will be overwritten (Ctrl+C to cancel)...");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let input = AppProxyInput {
        url: format!("{}/proxy", cfg.backend_url.trim_end_matches('/')),
        sub_path: cfg.proxy_subpath.clone(),
        sub_path_prefix: args.prefix.clone(),
    };
    println!("Proxy URL: {}", input.url);
    println!("Subpath: /{}/{}", input.sub_path_prefix, input.sub_path);

    let payload = client.set_app_proxy(&input).await?;
    if !payload.user_errors.is_empty() {
        for err in &payload.user_errors {
            let field = err.field.as_ref().map(|f| f.join(".")).unwrap_or_default();
            eprintln!("   - {}: {}", field, err.message);
        }
        bail!("appProxySet returned {} user error(s)", payload.user_errors.len());
    }

    match payload.app_proxy {
        Some(proxy) => {
            println!("App proxy configured:");
            println!("   URL: {}", proxy.url);
            println!("   Subpath: /{}/{}", proxy.sub_path_prefix, proxy.sub_path);
            for route in ["balance", "history", "redeem"] {
                println!(
                    "   https://{}/{}/{}/{}",
                    cfg.store_domain, proxy.sub_path_prefix, proxy.sub_path, route
                );
            }
        }
        None => println!("appProxySet succeeded but returned no proxy"),
    }

    Ok(())
}
