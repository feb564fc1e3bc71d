//! App proxy signature verification.
//!
//! The storefront gateway signs every forwarded request: all query parameters
//! except `signature` are grouped by key (repeated values joined with `,`),
//! sorted, rendered as `key=value` and concatenated without a separator. The
//! HMAC-SHA256 of that string under the app's shared secret, hex encoded, is
//! sent as `signature`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PARAM: &str = "signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no shared secret configured")]
    MissingSecret,
    #[error("signature parameter absent")]
    MissingSignature,
    #[error("signature is not valid hex")]
    MalformedSignature,
    #[error("signature does not match")]
    Mismatch,
    #[error("timestamp parameter is not a unix timestamp")]
    MalformedTimestamp,
    #[error("timestamp {0} outside tolerance")]
    StaleTimestamp(i64),
}

/// Verifies app proxy signatures against the shared secret.
#[derive(Clone)]
pub struct SignatureValidator {
    secret: Option<Vec<u8>>,
    tolerance_secs: i64,
}

impl SignatureValidator {
    /// `tolerance_secs == 0` disables the timestamp freshness check.
    pub fn new(secret: Option<&str>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.map(|s| s.as_bytes().to_vec()),
            tolerance_secs,
        }
    }

    /// Boolean verdict. Every error is a rejection.
    pub fn verify(&self, params: &[(String, String)], now: DateTime<Utc>) -> bool {
        self.check(params, now).is_ok()
    }

    pub fn check(&self, params: &[(String, String)], now: DateTime<Utc>) -> Result<(), SignatureError> {
        let secret = self.secret.as_deref().ok_or(SignatureError::MissingSecret)?;

        let provided = params
            .iter()
            .find(|(k, _)| k == SIGNATURE_PARAM)
            .map(|(_, v)| v.as_str())
            .ok_or(SignatureError::MissingSignature)?;
        let provided = hex::decode(provided).map_err(|_| SignatureError::MalformedSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::MissingSecret)?;
        mac.update(canonical_message(params).as_bytes());
        mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)?;

        if self.tolerance_secs > 0 {
            if let Some((_, raw)) = params.iter().find(|(k, _)| k == "timestamp") {
                let ts: i64 = raw.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
                if (now.timestamp() - ts).abs() > self.tolerance_secs {
                    return Err(SignatureError::StaleTimestamp(ts));
                }
            }
        }

        Ok(())
    }
}

/// The string the gateway signs for a parameter set.
pub fn canonical_message(params: &[(String, String)]) -> String {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (k, v) in params.iter().filter(|(k, _)| k != SIGNATURE_PARAM) {
        grouped.entry(k.as_str()).or_default().push(v.as_str());
    }

    grouped
        .into_iter()
        .map(|(k, vs)| format!("{}={}", k, vs.join(",")))
        .collect()
}

/// Hex HMAC of a parameter set. Used by operator tooling and tests to build signed requests.
pub fn sign(secret: &str, params: &[(String, String)]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(canonical_message(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Platform-injected parameters of a verified request.
///
/// Informational only. Handlers must not make authorization decisions from these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyContext {
    pub shop: Option<String>,
    pub timestamp: Option<i64>,
    pub logged_in_customer_id: Option<String>,
    pub path_prefix: Option<String>,
}

impl ProxyContext {
    pub fn from_params(params: &[(String, String)]) -> Self {
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };
        Self {
            shop: get("shop"),
            timestamp: get("timestamp").and_then(|t| t.parse().ok()),
            logged_in_customer_id: get("logged_in_customer_id"),
            path_prefix: get("path_prefix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn signed(secret: &str, pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut p = params(pairs);
        let sig = sign(secret, &p);
        p.push((SIGNATURE_PARAM.to_string(), sig));
        p
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    const BASE: &[(&str, &str)] = &[
        ("shop", "loja.myshopify.com"),
        ("path_prefix", "/apps/bazicash"),
        ("timestamp", "1700000000"),
        ("customer_email", "ana@example.com"),
    ];

    #[test]
    fn canonical_message_sorts_and_joins_repeated_keys() {
        let p = params(&[("b", "2"), ("a", "1"), ("b", "3"), ("signature", "zz")]);
        assert_eq!(canonical_message(&p), "a=1b=2,3");
    }

    #[test]
    fn accepts_valid_signature() {
        let v = SignatureValidator::new(Some("hush"), 90);
        assert_eq!(v.check(&signed("hush", BASE), now()), Ok(()));
    }

    #[test]
    fn rejects_missing_signature() {
        let v = SignatureValidator::new(Some("hush"), 90);
        assert_eq!(v.check(&params(BASE), now()), Err(SignatureError::MissingSignature));
    }

    #[test]
    fn rejects_wrong_secret() {
        let v = SignatureValidator::new(Some("hush"), 90);
        assert!(!v.verify(&signed("other", BASE), now()));
    }

    #[test]
    fn rejects_tampered_parameter() {
        let v = SignatureValidator::new(Some("hush"), 90);
        let mut p = signed("hush", BASE);
        p[3].1 = "mallory@example.com".to_string();
        assert_eq!(v.check(&p, now()), Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let v = SignatureValidator::new(Some("hush"), 90);
        let mut p = params(BASE);
        p.push(("signature".into(), "not-hex".into()));
        assert_eq!(v.check(&p, now()), Err(SignatureError::MalformedSignature));
    }

    #[test]
    fn fails_closed_without_secret() {
        let v = SignatureValidator::new(None, 90);
        assert_eq!(v.check(&signed("hush", BASE), now()), Err(SignatureError::MissingSecret));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let v = SignatureValidator::new(Some("hush"), 90);
        let later = now() + chrono::Duration::seconds(91);
        assert_eq!(
            v.check(&signed("hush", BASE), later),
            Err(SignatureError::StaleTimestamp(1_700_000_000))
        );
    }

    #[test]
    fn zero_tolerance_skips_freshness() {
        let v = SignatureValidator::new(Some("hush"), 0);
        let much_later = now() + chrono::Duration::days(30);
        assert!(v.verify(&signed("hush", BASE), much_later));
    }

    #[test]
    fn context_reads_platform_params() {
        let mut p = params(BASE);
        p.push(("logged_in_customer_id".into(), "".into()));
        let ctx = ProxyContext::from_params(&p);
        assert_eq!(ctx.shop.as_deref(), Some("loja.myshopify.com"));
        assert_eq!(ctx.timestamp, Some(1_700_000_000));
        assert_eq!(ctx.logged_in_customer_id, None);
        assert_eq!(ctx.path_prefix.as_deref(), Some("/apps/bazicash"));
    }
}
