use dotenvy::dotenv;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

/// Which collaborator answers customer and store-credit lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Live,
    Fixture,
}

impl std::str::FromStr for DataSourceKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "" => Ok(Self::Live),
            "fixture" | "mock" | "demo" => Ok(Self::Fixture),
            other => Err(eyre!("unknown data source '{}'", other)),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub api_secret: Option<String>,  // shared secret for app proxy signatures
    pub store_domain: String,
    pub api_version: String,
    pub access_token: String,
    pub port: u16,
    pub backend_url: String,         // only read by the setup_proxy utility
    pub proxy_subpath: String,
    pub timestamp_tolerance_secs: i64,
    pub data_source: DataSourceKind,
    pub default_currency: String,
}

// Credentials never end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("store_domain", &self.store_domain)
            .field("api_version", &self.api_version)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<set>"))
            .field("access_token", &if self.access_token.is_empty() { "<empty>" } else { "<set>" })
            .field("port", &self.port)
            .field("backend_url", &self.backend_url)
            .field("proxy_subpath", &self.proxy_subpath)
            .field("timestamp_tolerance_secs", &self.timestamp_tolerance_secs)
            .field("data_source", &self.data_source)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

impl Config {
    /// Admin GraphQL endpoint for the configured store and API version.
    pub fn graphql_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store_domain.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Storefront path prefix the platform routes to this backend, e.g. `/apps/bazicash`.
    pub fn proxy_prefix(&self) -> String {
        format!("/apps/{}", self.proxy_subpath)
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let api_key = env::var("SHOPIFY_API_KEY").unwrap_or_default();

    // Missing secret is allowed at startup; the validator then rejects everything.
    let api_secret = env::var("SHOPIFY_API_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty());

    let store_domain = env::var("SHOPIFY_STORE_DOMAIN").unwrap_or_default();

    let api_version = env::var("SHOPIFY_API_VERSION")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "2024-07".to_string());

    let access_token = env::var("SHOPIFY_ACCESS_TOKEN").unwrap_or_default();

    let port = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    let backend_url = env::var("BACKEND_URL")
        .unwrap_or_else(|_| "https://SEU-BACKEND.com".to_string());

    let proxy_subpath = env::var("APP_PROXY_SUBPATH")
        .map(|s| s.trim_matches('/').to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "bazicash".to_string());

    let timestamp_tolerance_secs = env::var("PROXY_TIMESTAMP_TOLERANCE_SECS")
        .unwrap_or_else(|_| "90".to_string())
        .parse()
        .unwrap_or(90);

    let data_source = env::var("BAZICASH_DATA_SOURCE")
        .unwrap_or_default()
        .parse::<DataSourceKind>()?;

    let default_currency = env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "BRL".to_string());

    let cfg = Config {
        api_key,
        api_secret,
        store_domain,
        api_version,
        access_token,
        port,
        backend_url,
        proxy_subpath,
        timestamp_tolerance_secs,
        data_source,
        default_currency,
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_key: "key".to_string(),
        api_secret: Some("hush".to_string()),
        store_domain: "loja-teste.myshopify.com".to_string(),
        api_version: "2024-07".to_string(),
        access_token: "shpat_test".to_string(),
        port: 3000,
        backend_url: "https://backend.test".to_string(),
        proxy_subpath: "bazicash".to_string(),
        timestamp_tolerance_secs: 0,
        data_source: DataSourceKind::Fixture,
        default_currency: "BRL".to_string(),
    }
}
