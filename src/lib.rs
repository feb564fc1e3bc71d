//! BaziCash cashback wallet: a signed app-proxy backend that relays store-credit
//! lookups to the commerce platform, and the storefront widget's controller.

pub mod api;
pub mod balance;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod models;
pub mod redeem;
pub mod shopify;
pub mod signature;
pub mod source;
pub mod stats;
pub mod widget;
